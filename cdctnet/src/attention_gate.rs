use candle::{Result, Tensor};
use candle_nn::{Conv2d, VarBuilder};

/// Projects both inputs to a single sigmoid channel and multiplies the two maps.
#[derive(Debug, Clone)]
pub struct AttentionGate {
    x_proj: Conv2d,
    g_proj: Conv2d,
    span: tracing::Span,
}

impl AttentionGate {
    pub fn new(x_channels: usize, g_channels: usize, vb: VarBuilder) -> Result<Self> {
        let x_proj = candle_nn::conv2d(x_channels, 1, 1, Default::default(), vb.pp("x"))?;
        let g_proj = candle_nn::conv2d(g_channels, 1, 1, Default::default(), vb.pp("g"))?;
        let span = tracing::span!(tracing::Level::TRACE, "attention-gate");
        Ok(Self {
            x_proj,
            g_proj,
            span,
        })
    }

    /// Returns a `(batch, 1, height, width)` map with values in `[0, 1]`.
    pub fn forward(&self, xs: &Tensor, gs: &Tensor) -> Result<Tensor> {
        let _enter = self.span.enter();
        let xs = candle_nn::ops::sigmoid(&xs.apply(&self.x_proj)?)?;
        let gs = candle_nn::ops::sigmoid(&gs.apply(&self.g_proj)?)?;
        xs * gs
    }
}
