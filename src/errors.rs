use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot scan {path:?}: {reason}")]
    InaccessibleRoot { path: PathBuf, reason: String },

    #[error("a scan is still running; stop it before starting another")]
    ScanInProgress,

    #[error("invalid size {input:?}: {reason}")]
    InvalidSize { input: String, reason: String },

    #[error("scan error: {0}")]
    Scan(String),
}
