use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("artifact not found: {0:?}")]
    Missing(PathBuf),
    #[error("artifact mismatch: {0}")]
    Mismatch(String),
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    Dimensions { expected: usize, actual: usize },
    #[error("cannot build an index over an empty corpus")]
    EmptyCorpus,
}

pub type Result<T> = std::result::Result<T, IndexError>;
