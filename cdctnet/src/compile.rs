//! Optimizer, loss and metric configuration attached to a built model.
use crate::summary::Summary;
use crate::{loss, metrics, CdctNet, Error, Result};
use candle::{ModuleT, Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW, VarMap};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Optimizer {
    /// Adam without weight decay.
    Adam {
        lr: f64,
        beta1: f64,
        beta2: f64,
        eps: f64,
    },
}

impl Optimizer {
    pub fn adam() -> Self {
        Self::Adam {
            lr: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-7,
        }
    }

    fn params(&self) -> ParamsAdamW {
        match *self {
            Self::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => ParamsAdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay: 0.,
            },
        }
    }
}

impl FromStr for Optimizer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "adam" => Ok(Self::adam()),
            _ => Err(Error::UnknownIdentifier {
                kind: "optimizer",
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adam { .. } => f.write_str("adam"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    BinaryCrossEntropy,
}

impl Loss {
    pub fn compute(&self, inp: &Tensor, target: &Tensor) -> candle::Result<Tensor> {
        match self {
            Self::BinaryCrossEntropy => loss::binary_cross_entropy(inp, target),
        }
    }
}

impl FromStr for Loss {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binary_crossentropy" => Ok(Self::BinaryCrossEntropy),
            _ => Err(Error::UnknownIdentifier {
                kind: "loss",
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BinaryCrossEntropy => f.write_str("binary_crossentropy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Accuracy,
}

impl Metric {
    pub fn compute(&self, inp: &Tensor, target: &Tensor) -> candle::Result<f32> {
        match self {
            Self::Accuracy => metrics::binary_accuracy(inp, target, 0.5),
        }
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accuracy" => Ok(Self::Accuracy),
            _ => Err(Error::UnknownIdentifier {
                kind: "metric",
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accuracy => f.write_str("accuracy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileConfig {
    pub optimizer: Optimizer,
    pub loss: Loss,
    pub metrics: Vec<Metric>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            optimizer: Optimizer::adam(),
            loss: Loss::BinaryCrossEntropy,
            metrics: vec![Metric::Accuracy],
        }
    }
}

impl CompileConfig {
    /// Builds a configuration from identifiers such as `("adam", "binary_crossentropy",
    /// &["accuracy"])`.
    pub fn from_names(optimizer: &str, loss: &str, metrics: &[&str]) -> Result<Self> {
        Ok(Self {
            optimizer: optimizer.parse()?,
            loss: loss.parse()?,
            metrics: metrics.iter().map(|m| m.parse()).collect::<Result<Vec<_>>>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub metrics: Vec<(Metric, f32)>,
}

/// Batch norm running statistics are updated in place during training rather than by the
/// optimizer.
fn is_trainable(name: &str) -> bool {
    !(name.ends_with(".running_mean") || name.ends_with(".running_var"))
}

/// Variables of the map that the optimizer updates, sorted by name.
pub fn trainable_vars(varmap: &VarMap) -> Vec<Var> {
    let data = varmap.data().lock().unwrap();
    let mut vars: Vec<_> = data
        .iter()
        .filter(|(name, _)| is_trainable(name))
        .collect();
    vars.sort_by(|(a, _), (b, _)| a.cmp(b));
    vars.into_iter().map(|(_, var)| var.clone()).collect()
}

pub(crate) fn count_params(varmap: &VarMap, prefix: &str) -> (usize, usize) {
    let data = varmap.data().lock().unwrap();
    let prefix = format!("{prefix}.");
    let mut trainable = 0;
    let mut non_trainable = 0;
    for (name, var) in data.iter().filter(|(name, _)| name.starts_with(&prefix)) {
        if is_trainable(name) {
            trainable += var.elem_count()
        } else {
            non_trainable += var.elem_count()
        }
    }
    (trainable, non_trainable)
}

/// A model bound to its variables, optimizer, loss and metrics.
pub struct CompiledModel {
    model: CdctNet,
    varmap: VarMap,
    config: CompileConfig,
    optimizer: AdamW,
}

impl CdctNet {
    /// Attaches the optimizer, loss and metrics. Nothing is computed at this point.
    pub fn compile(self, varmap: VarMap, config: CompileConfig) -> Result<CompiledModel> {
        let vars = trainable_vars(&varmap);
        tracing::debug!(
            optimizer = %config.optimizer,
            loss = %config.loss,
            vars = vars.len(),
            "compiling {}",
            self.name()
        );
        let optimizer = AdamW::new(vars, config.optimizer.params())?;
        Ok(CompiledModel {
            model: self,
            varmap,
            config,
            optimizer,
        })
    }
}

impl CompiledModel {
    pub fn model(&self) -> &CdctNet {
        &self.model
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn summary(&self) -> Result<Summary> {
        Summary::new(self.model.config(), &self.varmap)
    }

    fn evaluation(&self, probs: &Tensor, loss: &Tensor, ys: &Tensor) -> Result<Evaluation> {
        let metrics = self
            .config
            .metrics
            .iter()
            .map(|m| Ok((*m, m.compute(probs, ys)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Evaluation {
            loss: loss.to_scalar::<f32>()?,
            metrics,
        })
    }

    /// Loss and metrics of an inference-mode forward pass.
    pub fn evaluate(&self, xs: &Tensor, ys: &Tensor) -> Result<Evaluation> {
        let probs = self.model.forward_t(xs, false)?;
        let loss = self.config.loss.compute(&probs, ys)?;
        self.evaluation(&probs, &loss, ys)
    }

    /// Runs a single optimization step on one batch and reports the loss and metrics of the
    /// batch before the update.
    pub fn train_step(&mut self, xs: &Tensor, ys: &Tensor) -> Result<Evaluation> {
        let probs = self.model.forward_t(xs, true)?;
        let loss = self.config.loss.compute(&probs, ys)?;
        self.optimizer.backward_step(&loss)?;
        self.evaluation(&probs, &loss, ys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() -> Result<()> {
        let cfg = CompileConfig::from_names("adam", "binary_crossentropy", &["accuracy"])?;
        assert_eq!(cfg, CompileConfig::default());
        assert_eq!(cfg.optimizer.to_string(), "adam");
        assert_eq!(cfg.loss.to_string(), "binary_crossentropy");
        assert_eq!(cfg.metrics[0].to_string(), "accuracy");
        Ok(())
    }

    #[test]
    fn unknown_identifiers() {
        let err = CompileConfig::from_names("sgd", "binary_crossentropy", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownIdentifier {
                kind: "optimizer",
                ..
            }
        ));
        let err = CompileConfig::from_names("adam", "mse", &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownIdentifier { kind: "loss", .. }));
        let err = CompileConfig::from_names("adam", "binary_crossentropy", &["f1"]).unwrap_err();
        assert!(matches!(err, Error::UnknownIdentifier { kind: "metric", .. }));
    }

    #[test]
    fn running_stats_are_not_trainable() {
        assert!(is_trainable("encoder.0.bn.weight"));
        assert!(is_trainable("encoder.0.conv.bias"));
        assert!(!is_trainable("encoder.0.bn.running_mean"));
        assert!(!is_trainable("decoder.3.bn.running_var"));
    }
}
