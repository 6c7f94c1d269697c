/// Errors raised while configuring, building or compiling a model.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(
        "shape mismatch in decoder stage {stage} concat, upsampled: {upsampled:?}, skip: {skip:?}"
    )]
    ConcatShapeMismatch {
        stage: usize,
        upsampled: (usize, usize),
        skip: (usize, usize),
    },

    #[error("unknown {kind} identifier {name:?}")]
    UnknownIdentifier { kind: &'static str, name: String },

    #[error(transparent)]
    Candle(#[from] candle::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
