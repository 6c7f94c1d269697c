use crate::{Error, Result};
use serde::Deserialize;

/// Input image shape, written height/width/channels. Tensors fed to the model are laid out
/// as `(batch, channels, height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Default for InputShape {
    fn default() -> Self {
        Self {
            height: 256,
            width: 256,
            channels: 3,
        }
    }
}

fn default_encoder_widths() -> Vec<usize> {
    vec![32, 64, 128, 256]
}

fn default_decoder_widths() -> Vec<usize> {
    vec![256, 128, 64, 32]
}

fn default_out_channels() -> usize {
    1
}

fn default_batch_norm_eps() -> f64 {
    1e-3
}

fn default_batch_norm_momentum() -> f64 {
    0.01
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputShape,
    #[serde(default = "default_encoder_widths")]
    pub encoder_widths: Vec<usize>,
    #[serde(default = "default_decoder_widths")]
    pub decoder_widths: Vec<usize>,
    #[serde(default = "default_out_channels")]
    pub out_channels: usize,
    #[serde(default = "default_batch_norm_eps")]
    pub batch_norm_eps: f64,
    /// Weight given to the current batch statistics when updating the running ones.
    #[serde(default = "default_batch_norm_momentum")]
    pub batch_norm_momentum: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputShape::default(),
            encoder_widths: default_encoder_widths(),
            decoder_widths: default_decoder_widths(),
            out_channels: default_out_channels(),
            batch_norm_eps: default_batch_norm_eps(),
            batch_norm_momentum: default_batch_norm_momentum(),
        }
    }
}

impl Config {
    pub fn with_input(height: usize, width: usize) -> Self {
        Self {
            input: InputShape {
                height,
                width,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of channels at the bottleneck, i.e. the deepest encoder width.
    pub fn bottleneck_channels(&self) -> usize {
        self.encoder_widths.last().copied().unwrap_or(self.input.channels)
    }

    pub fn batch_norm_config(&self) -> candle_nn::BatchNormConfig {
        candle_nn::BatchNormConfig {
            eps: self.batch_norm_eps,
            remove_mean: true,
            affine: true,
            momentum: self.batch_norm_momentum,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let InputShape {
            height,
            width,
            channels,
        } = self.input;
        if height == 0 || width == 0 || channels == 0 {
            return Err(Error::InvalidConfig(format!(
                "input shape must be non-zero, got {height}x{width}x{channels}"
            )));
        }
        if self.encoder_widths.is_empty() {
            return Err(Error::InvalidConfig("no encoder widths".to_string()));
        }
        if self.encoder_widths.len() != self.decoder_widths.len() {
            return Err(Error::InvalidConfig(format!(
                "{} encoder widths but {} decoder widths",
                self.encoder_widths.len(),
                self.decoder_widths.len()
            )));
        }
        let widths = self.encoder_widths.iter().chain(self.decoder_widths.iter());
        if widths.chain([&self.out_channels]).any(|&w| w == 0) {
            return Err(Error::InvalidConfig("zero channel width".to_string()));
        }
        if self.batch_norm_eps < 0. {
            return Err(Error::InvalidConfig(format!(
                "batch norm eps must be non-negative, got {}",
                self.batch_norm_eps
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults() -> Result<()> {
        let config = Config::from_json(r#"{"input": {"height": 64, "width": 128, "channels": 3}}"#)?;
        assert_eq!(config.input.height, 64);
        assert_eq!(config.input.width, 128);
        assert_eq!(config.encoder_widths, [32, 64, 128, 256]);
        assert_eq!(config.decoder_widths, [256, 128, 64, 32]);
        assert_eq!(config.bottleneck_channels(), 256);
        assert_eq!(Config::from_json("{}")?, Config::default());
        Ok(())
    }

    #[test]
    fn invalid_widths() {
        let config = Config {
            decoder_widths: vec![64, 32],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        let config = Config {
            encoder_widths: vec![32, 0, 128, 256],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        assert!(Config::from_json(r#"{"input": {"height": 0, "width": 16, "channels": 3}}"#).is_err());
    }
}
