//! The CDCTNet landslide segmentation model: a U-Net encoder/decoder with a convolutional
//! attention-fusion bottleneck and a sigmoid segmentation head.
use crate::attention_fusion::AttentionFusion;
use crate::decoder::{Decoder, StageTrace};
use crate::encoder::{Encoder, EncoderOutput};
use crate::{shape, Config, Result};
use candle::{DType, Device, ModuleT, Tensor};
use candle_nn::{Conv2d, VarBuilder, VarMap};

pub const NAME: &str = "Landslide_Segmentation";

#[derive(Debug, Clone)]
pub struct CdctNet {
    encoder: Encoder,
    fusion: AttentionFusion,
    decoder: Decoder,
    head: Conv2d,
    config: Config,
    span: tracing::Span,
}

/// Every intermediate tensor of a forward pass.
#[derive(Debug, Clone)]
pub struct ForwardTrace {
    pub encoder: EncoderOutput,
    pub bottleneck: Tensor,
    pub decoder: Vec<StageTrace>,
    pub output: Tensor,
}

impl CdctNet {
    pub fn new(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        let layers = shape::plan(cfg)?;
        tracing::debug!(layers = layers.len(), input = ?cfg.input, "building {NAME}");
        let encoder = Encoder::new(cfg, vb.pp("encoder"))?;
        let fusion = AttentionFusion::new(cfg.bottleneck_channels(), vb.pp("fusion"))?;
        let decoder = Decoder::new(cfg, vb.pp("decoder"))?;
        let c_in = cfg.decoder_widths.last().copied().unwrap_or(cfg.bottleneck_channels());
        let head = candle_nn::conv2d(c_in, cfg.out_channels, 1, Default::default(), vb.pp("head"))?;
        let span = tracing::span!(tracing::Level::TRACE, "cdctnet");
        Ok(Self {
            encoder,
            fusion,
            decoder,
            head,
            config: cfg.clone(),
            span,
        })
    }

    /// Builds a model with freshly initialized f32 variables held in the returned [`VarMap`].
    pub fn build(cfg: &Config, device: &Device) -> Result<(Self, VarMap)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let model = Self::new(cfg, vb)?;
        Ok((model, varmap))
    }

    pub fn name(&self) -> &'static str {
        NAME
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn fusion(&self) -> &AttentionFusion {
        &self.fusion
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Inference-mode forward pass, batch norms use their running statistics.
    pub fn forward(&self, xs: &Tensor) -> candle::Result<Tensor> {
        self.forward_t(xs, false)
    }

    pub fn forward_trace(&self, xs: &Tensor, train: bool) -> candle::Result<ForwardTrace> {
        let _enter = self.span.enter();
        let (_, c, _, _) = xs.dims4()?;
        if c != self.config.input.channels {
            candle::bail!(
                "expected {} input channels, got {:?}",
                self.config.input.channels,
                xs.shape()
            )
        }
        let encoder = self.encoder.forward_t(xs, train)?;
        let bottleneck = encoder.xs.apply(&self.fusion)?;
        let decoder = self.decoder.forward_trace(&bottleneck, &encoder.skips, train)?;
        let ys = match decoder.last() {
            Some(trace) => &trace.xs,
            None => &bottleneck,
        };
        let output = candle_nn::ops::sigmoid(&ys.apply(&self.head)?)?;
        Ok(ForwardTrace {
            encoder,
            bottleneck,
            decoder,
            output,
        })
    }
}

impl ModuleT for CdctNet {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle::Result<Tensor> {
        Ok(self.forward_trace(xs, train)?.output)
    }
}
