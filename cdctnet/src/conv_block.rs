use candle::{ModuleT, Result, Tensor};
use candle_nn::{batch_norm, BatchNorm, BatchNormConfig, Conv2d, Conv2dConfig, VarBuilder};

/// 3x3 same-padded convolution followed by batch norm and relu.
#[derive(Debug, Clone)]
pub struct ConvBlock {
    conv: Conv2d,
    bn: BatchNorm,
    span: tracing::Span,
}

impl ConvBlock {
    pub fn new(c_in: usize, c_out: usize, bn_cfg: BatchNormConfig, vb: VarBuilder) -> Result<Self> {
        let conv_cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let conv = candle_nn::conv2d(c_in, c_out, 3, conv_cfg, vb.pp("conv"))?;
        let bn = batch_norm(c_out, bn_cfg, vb.pp("bn"))?;
        let span = tracing::span!(tracing::Level::TRACE, "conv-block");
        Ok(Self { conv, bn, span })
    }
}

impl ModuleT for ConvBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let _enter = self.span.enter();
        xs.apply(&self.conv)?.apply_t(&self.bn, train)?.relu()
    }
}
