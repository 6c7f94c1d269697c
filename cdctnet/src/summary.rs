use crate::compile::count_params;
use crate::shape::{self, LayerKind};
use crate::{model, Config, Result};
use candle_nn::VarMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub name: String,
    pub kind: LayerKind,
    pub output: (usize, usize, usize),
    pub params: usize,
}

/// Layer-by-layer structural description of a model with parameter counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub name: String,
    pub rows: Vec<SummaryRow>,
    pub trainable_params: usize,
    pub non_trainable_params: usize,
}

impl Summary {
    pub fn new(cfg: &Config, varmap: &VarMap) -> Result<Self> {
        let mut rows = vec![];
        let mut trainable_params = 0;
        let mut non_trainable_params = 0;
        for layer in shape::plan(cfg)? {
            let (trainable, non_trainable) = count_params(varmap, &layer.name);
            trainable_params += trainable;
            non_trainable_params += non_trainable;
            rows.push(SummaryRow {
                name: layer.name,
                kind: layer.kind,
                output: layer.output,
                params: trainable + non_trainable,
            })
        }
        Ok(Self {
            name: model::NAME.to_string(),
            rows,
            trainable_params,
            non_trainable_params,
        })
    }

    pub fn total_params(&self) -> usize {
        self.trainable_params + self.non_trainable_params
    }
}

const LAYER_WIDTH: usize = 44;
const SHAPE_WIDTH: usize = 26;
const PARAMS_WIDTH: usize = 12;

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = LAYER_WIDTH + SHAPE_WIDTH + PARAMS_WIDTH;
        writeln!(f, "Model: \"{}\"", self.name)?;
        writeln!(f, "{}", "=".repeat(width))?;
        writeln!(
            f,
            "{:<LAYER_WIDTH$}{:<SHAPE_WIDTH$}{:>PARAMS_WIDTH$}",
            "Layer (type)", "Output Shape", "Param #"
        )?;
        writeln!(f, "{}", "=".repeat(width))?;
        for row in self.rows.iter() {
            let (c, h, w) = row.output;
            let layer = format!("{} ({})", row.name, row.kind);
            let shape = format!("(None, {c}, {h}, {w})");
            writeln!(
                f,
                "{layer:<LAYER_WIDTH$}{shape:<SHAPE_WIDTH$}{:>PARAMS_WIDTH$}",
                row.params
            )?;
        }
        writeln!(f, "{}", "=".repeat(width))?;
        writeln!(f, "Total params: {}", self.total_params())?;
        writeln!(f, "Trainable params: {}", self.trainable_params)?;
        write!(f, "Non-trainable params: {}", self.non_trainable_params)
    }
}

