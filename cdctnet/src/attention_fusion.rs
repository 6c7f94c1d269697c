//! Bottleneck block fusing a "local" and a "global" branch.
//!
//! The branch names follow the positional-encoding / local / global attention vocabulary of
//! the architecture, but there is no query/key/value projection nor any softmax here: the
//! local branch is two chained depthwise 3x3 convolutions and the global branch is a
//! pointwise convolution, summed elementwise.
use candle::{Module, Result, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, VarBuilder};

#[derive(Debug, Clone)]
pub struct AttentionFusion {
    cpe: Conv2d,
    lsa: Conv2d,
    gsa: Conv2d,
    span: tracing::Span,
}

impl AttentionFusion {
    pub fn new(channels: usize, vb: VarBuilder) -> Result<Self> {
        let depthwise = Conv2dConfig {
            padding: 1,
            groups: channels,
            ..Default::default()
        };
        let cpe = candle_nn::conv2d(channels, channels, 3, depthwise, vb.pp("cpe"))?;
        let lsa = candle_nn::conv2d(channels, channels, 3, depthwise, vb.pp("lsa"))?;
        let gsa = candle_nn::conv2d(channels, channels, 1, Default::default(), vb.pp("gsa"))?;
        let span = tracing::span!(tracing::Level::TRACE, "attention-fusion");
        Ok(Self {
            cpe,
            lsa,
            gsa,
            span,
        })
    }

    /// Output of the positional-encoding convolution.
    pub fn positional_encoding(&self, xs: &Tensor) -> Result<Tensor> {
        xs.apply(&self.cpe)
    }

    /// Local branch: depthwise convolution chained after the positional encoding.
    pub fn local_attention(&self, xs: &Tensor) -> Result<Tensor> {
        self.positional_encoding(xs)?.apply(&self.lsa)
    }

    /// Global branch: pointwise convolution over the block input.
    pub fn global_attention(&self, xs: &Tensor) -> Result<Tensor> {
        xs.apply(&self.gsa)
    }
}

impl Module for AttentionFusion {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let _enter = self.span.enter();
        let local = self.local_attention(xs)?;
        let global = self.global_attention(xs)?;
        local + global
    }
}
