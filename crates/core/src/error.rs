use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pdf extraction failed for {path:?}: {message}")]
    Pdf { path: PathBuf, message: String },
    #[error("unsupported input format: {0:?}")]
    UnsupportedInput(PathBuf),
    #[error("no chunks produced from {0:?}")]
    EmptyCorpus(PathBuf),
    #[error("invalid chunk config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = std::result::Result<T, CoreError>;
