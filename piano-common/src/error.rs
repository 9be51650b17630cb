//! Common error types for the piano tuner

use thiserror::Error;

/// Common result type for piano tuner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by the core and the HTTP service
#[derive(Error, Debug)]
pub enum Error {
    /// Note identifier is not one of the 25 known keys
    #[error("Invalid note: {0}")]
    InvalidNote(String),

    /// Session token missing, malformed, or carrying a bad signature
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Malformed request or unparsable submission
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secret state could not be written to disk
    #[error("Persistence error: {0}")]
    Persist(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caused by the client rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidNote(_) | Error::InvalidToken(_) | Error::InvalidRequest(_)
        )
    }
}
