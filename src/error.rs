use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Unknown information set: {0}")]
    UnknownInfoSet(String),

    #[error("Action {action} is not legal at information set: {info_set}")]
    IllegalAction { info_set: String, action: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
