//! Resolution-restoring half of the network.
//!
//! Every stage doubles the spatial size with a learned 2x2 transposed convolution, fuses the
//! matching skip tensor by channel concatenation and refines the result with a
//! [`ConvBlock`]. The attention gate of a stage is evaluated against the skip tensor but its
//! output does not take part in the fusion: the concatenation uses the raw up-sampled tensor.
use crate::attention_gate::AttentionGate;
use crate::conv_block::ConvBlock;
use crate::encoder::SkipConnections;
use crate::Config;
use candle::{ModuleT, Result, Tensor};
use candle_nn::{ConvTranspose2d, ConvTranspose2dConfig, VarBuilder};

#[derive(Debug, Clone)]
pub struct DecoderStage {
    index: usize,
    up: ConvTranspose2d,
    gate: AttentionGate,
    block: ConvBlock,
    span: tracing::Span,
}

/// Intermediate tensors of a decoder stage.
#[derive(Debug, Clone)]
pub struct StageTrace {
    pub upsampled: Tensor,
    pub gate: Tensor,
    pub fused: Tensor,
    pub xs: Tensor,
}

impl DecoderStage {
    pub fn new(
        index: usize,
        c_in: usize,
        c_skip: usize,
        c_out: usize,
        cfg: &Config,
        vb: VarBuilder,
    ) -> Result<Self> {
        let up_cfg = ConvTranspose2dConfig {
            stride: 2,
            ..Default::default()
        };
        let up = candle_nn::conv_transpose2d(c_in, c_out, 2, up_cfg, vb.pp("up"))?;
        let gate = AttentionGate::new(c_out, c_skip, vb.pp("gate"))?;
        let block = ConvBlock::new(c_out + c_skip, c_out, cfg.batch_norm_config(), vb)?;
        let span = tracing::span!(tracing::Level::TRACE, "decoder-stage", index);
        Ok(Self {
            index,
            up,
            gate,
            block,
            span,
        })
    }

    pub fn forward_trace(&self, xs: &Tensor, skip: &Tensor, train: bool) -> Result<StageTrace> {
        let _enter = self.span.enter();
        let upsampled = xs.apply(&self.up)?;
        let (_, _, up_h, up_w) = upsampled.dims4()?;
        let (_, _, skip_h, skip_w) = skip.dims4()?;
        if (up_h, up_w) != (skip_h, skip_w) {
            candle::bail!(
                "shape mismatch in decoder stage {} concat, upsampled: {:?}, skip: {:?}",
                self.index,
                upsampled.shape(),
                skip.shape()
            )
        }
        let gate = self.gate.forward(&upsampled, skip)?;
        let fused = Tensor::cat(&[&upsampled, skip], 1)?;
        let xs = self.block.forward_t(&fused, train)?;
        Ok(StageTrace {
            upsampled,
            gate,
            fused,
            xs,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Decoder {
    stages: Vec<DecoderStage>,
    span: tracing::Span,
}

impl Decoder {
    pub fn new(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        let mut c_in = cfg.bottleneck_channels();
        let skip_widths = cfg.encoder_widths.iter().rev();
        let mut stages = Vec::with_capacity(cfg.decoder_widths.len());
        for (index, (&c_out, &c_skip)) in cfg.decoder_widths.iter().zip(skip_widths).enumerate() {
            stages.push(DecoderStage::new(index, c_in, c_skip, c_out, cfg, vb.pp(index))?);
            c_in = c_out;
        }
        let span = tracing::span!(tracing::Level::TRACE, "decoder");
        Ok(Self { stages, span })
    }

    pub fn stages(&self) -> &[DecoderStage] {
        &self.stages
    }

    /// Runs every stage and returns their intermediate tensors, shallowest output last.
    pub fn forward_trace(
        &self,
        xs: &Tensor,
        skips: &SkipConnections,
        train: bool,
    ) -> Result<Vec<StageTrace>> {
        let _enter = self.span.enter();
        if skips.len() != self.stages.len() {
            candle::bail!(
                "decoder has {} stages but got {} skip connections",
                self.stages.len(),
                skips.len()
            )
        }
        let mut xs = xs.clone();
        let mut traces = Vec::with_capacity(self.stages.len());
        for (stage, skip) in self.stages.iter().zip(skips.deepest_first()) {
            let trace = stage.forward_trace(&xs, skip, train)?;
            xs = trace.xs.clone();
            traces.push(trace);
        }
        Ok(traces)
    }

    pub fn forward_t(&self, xs: &Tensor, skips: &SkipConnections, train: bool) -> Result<Tensor> {
        let traces = self.forward_trace(xs, skips, train)?;
        match traces.into_iter().last() {
            Some(trace) => Ok(trace.xs),
            None => Ok(xs.clone()),
        }
    }
}
