//! Error types for the link simulator

use std::io;
use thiserror::Error;

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors that can occur while building, running or serializing a link
#[derive(Error, Debug)]
pub enum LinkError {
    /// A caller-supplied parameter is outside its valid domain.
    /// Raised before any output is produced.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// File sink or config source failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// WAV encoding failed
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LinkError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        LinkError::InvalidParameter(msg.into())
    }
}
