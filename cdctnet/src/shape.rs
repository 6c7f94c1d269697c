//! Static shape planning.
//!
//! Output shapes of every layer are derived from the [`Config`] alone, so an input size that
//! cannot be reconciled by the decoder is rejected when the model is built rather than on the
//! first forward pass.
use crate::{Config, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Input,
    Conv2d,
    DepthwiseConv2d,
    BatchNorm,
    Relu,
    MaxPool2d,
    Add,
    ConvTranspose2d,
    Multiply,
    Concat,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Input => "InputLayer",
            Self::Conv2d => "Conv2D",
            Self::DepthwiseConv2d => "DepthwiseConv2D",
            Self::BatchNorm => "BatchNormalization",
            Self::Relu => "ReLU",
            Self::MaxPool2d => "MaxPooling2D",
            Self::Add => "Add",
            Self::ConvTranspose2d => "Conv2DTranspose",
            Self::Multiply => "Multiply",
            Self::Concat => "Concatenate",
        };
        f.write_str(s)
    }
}

/// A layer of the planned graph. `name` doubles as the variable prefix of layers that own
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerShape {
    pub name: String,
    pub kind: LayerKind,
    /// `(channels, height, width)`, the batch dimension is left out.
    pub output: (usize, usize, usize),
}

struct Planner {
    layers: Vec<LayerShape>,
}

impl Planner {
    fn push(&mut self, name: String, kind: LayerKind, output: (usize, usize, usize)) {
        self.layers.push(LayerShape { name, kind, output })
    }

    fn conv_block(&mut self, prefix: &str, c_out: usize, h: usize, w: usize) {
        self.push(format!("{prefix}.conv"), LayerKind::Conv2d, (c_out, h, w));
        self.push(format!("{prefix}.bn"), LayerKind::BatchNorm, (c_out, h, w));
        self.push(format!("{prefix}.relu"), LayerKind::Relu, (c_out, h, w));
    }
}

pub fn plan(cfg: &Config) -> Result<Vec<LayerShape>> {
    cfg.validate()?;
    let mut p = Planner { layers: vec![] };
    let (mut h, mut w) = (cfg.input.height, cfg.input.width);
    p.push("input".to_string(), LayerKind::Input, (cfg.input.channels, h, w));

    let mut skips = Vec::with_capacity(cfg.encoder_widths.len());
    for (index, &c_out) in cfg.encoder_widths.iter().enumerate() {
        p.conv_block(&format!("encoder.{index}"), c_out, h, w);
        skips.push((c_out, h, w));
        (h, w) = (h / 2, w / 2);
        p.push(format!("encoder.{index}.pool"), LayerKind::MaxPool2d, (c_out, h, w));
    }

    let c = cfg.bottleneck_channels();
    p.push("fusion.cpe".to_string(), LayerKind::DepthwiseConv2d, (c, h, w));
    p.push("fusion.lsa".to_string(), LayerKind::DepthwiseConv2d, (c, h, w));
    p.push("fusion.gsa".to_string(), LayerKind::Conv2d, (c, h, w));
    p.push("fusion.add".to_string(), LayerKind::Add, (c, h, w));

    for (index, (&c_out, &(c_skip, skip_h, skip_w))) in
        cfg.decoder_widths.iter().zip(skips.iter().rev()).enumerate()
    {
        let prefix = format!("decoder.{index}");
        (h, w) = (h * 2, w * 2);
        p.push(format!("{prefix}.up"), LayerKind::ConvTranspose2d, (c_out, h, w));
        if (h, w) != (skip_h, skip_w) {
            return Err(Error::ConcatShapeMismatch {
                stage: index,
                upsampled: (h, w),
                skip: (skip_h, skip_w),
            });
        }
        p.push(format!("{prefix}.gate.x"), LayerKind::Conv2d, (1, h, w));
        p.push(format!("{prefix}.gate.g"), LayerKind::Conv2d, (1, h, w));
        p.push(format!("{prefix}.gate.mul"), LayerKind::Multiply, (1, h, w));
        p.push(format!("{prefix}.concat"), LayerKind::Concat, (c_out + c_skip, h, w));
        p.conv_block(&prefix, c_out, h, w);
    }

    p.push("head".to_string(), LayerKind::Conv2d, (cfg.out_channels, h, w));
    Ok(p.layers)
}

/// Output shape `(channels, height, width)` of the model for the given config.
pub fn output_shape(cfg: &Config) -> Result<(usize, usize, usize)> {
    let layers = plan(cfg)?;
    match layers.last() {
        Some(layer) => Ok(layer.output),
        None => Err(Error::InvalidConfig("empty model".to_string())),
    }
}
