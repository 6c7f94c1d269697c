//! CDCTNet, a U-Net style binary segmentation network with a convolutional attention-fusion
//! bottleneck, built on candle.
//!
//! ```no_run
//! use candle::{DType, Device, Tensor};
//! use cdctnet::{CdctNet, CompileConfig, Config};
//!
//! # fn main() -> cdctnet::Result<()> {
//! let (model, varmap) = CdctNet::build(&Config::default(), &Device::Cpu)?;
//! let model = model.compile(varmap, CompileConfig::default())?;
//! println!("{}", model.summary()?);
//! let xs = Tensor::zeros((1, 3, 256, 256), DType::F32, &Device::Cpu)?;
//! let mask = model.model().forward(&xs)?;
//! assert_eq!(mask.dims(), &[1, 1, 256, 256]);
//! # Ok(())
//! # }
//! ```
pub mod attention_fusion;
pub mod attention_gate;
pub mod compile;
pub mod config;
pub mod conv_block;
pub mod decoder;
pub mod encoder;
mod error;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod shape;
pub mod summary;

pub use compile::{CompileConfig, CompiledModel, Evaluation, Loss, Metric, Optimizer};
pub use config::{Config, InputShape};
pub use error::{Error, Result};
pub use model::CdctNet;
pub use summary::Summary;
