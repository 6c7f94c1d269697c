//! Feature-extraction half of the network.
//!
//! Each stage runs a [`ConvBlock`], keeps its output as a skip connection and halves the
//! spatial resolution with a 2x2 max-pooling.
use crate::conv_block::ConvBlock;
use crate::Config;
use candle::{ModuleT, Result, Tensor};
use candle_nn::VarBuilder;

/// Encoder outputs kept for the decoder, ordered from the shallowest stage to the deepest one.
#[derive(Debug, Clone)]
pub struct SkipConnections(Vec<Tensor>);

impl SkipConnections {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, depth: usize) -> Option<&Tensor> {
        self.0.get(depth)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Tensor> {
        self.0.iter()
    }

    /// Skip tensors deepest first, the order in which the decoder consumes them.
    pub fn deepest_first(&self) -> impl Iterator<Item = &Tensor> {
        self.0.iter().rev()
    }
}

#[derive(Debug, Clone)]
pub struct EncoderOutput {
    pub xs: Tensor,
    pub skips: SkipConnections,
}

#[derive(Debug, Clone)]
pub struct Encoder {
    blocks: Vec<ConvBlock>,
    span: tracing::Span,
}

impl Encoder {
    pub fn new(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        let bn_cfg = cfg.batch_norm_config();
        let mut c_in = cfg.input.channels;
        let mut blocks = Vec::with_capacity(cfg.encoder_widths.len());
        for (index, &c_out) in cfg.encoder_widths.iter().enumerate() {
            blocks.push(ConvBlock::new(c_in, c_out, bn_cfg, vb.pp(index))?);
            c_in = c_out;
        }
        let span = tracing::span!(tracing::Level::TRACE, "encoder");
        Ok(Self { blocks, span })
    }

    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Result<EncoderOutput> {
        let _enter = self.span.enter();
        let mut xs = xs.clone();
        let mut skips = Vec::with_capacity(self.blocks.len());
        for block in self.blocks.iter() {
            let ys = block.forward_t(&xs, train)?;
            xs = ys.max_pool2d(2)?;
            skips.push(ys);
        }
        Ok(EncoderOutput {
            xs,
            skips: SkipConnections(skips),
        })
    }
}
