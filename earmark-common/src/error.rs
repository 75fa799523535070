//! Common error types for earmark

use thiserror::Error;

/// Common result type for earmark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the core and the HTTP layer
#[derive(Error, Debug)]
pub enum Error {
    /// Relative path resolves outside the media root
    #[error("Requested path is outside the media root")]
    PathEscape,

    /// Path does not exist or is not the expected kind (file vs. directory)
    #[error("Not found: {0}")]
    NotFound(String),

    /// File extension is not in the audio allow-list
    #[error("Unsupported file type")]
    UnsupportedType,

    /// Session lacks the authenticated flag
    #[error("Not authenticated")]
    Unauthenticated,

    /// Missing or mismatched CSRF token
    #[error("Invalid CSRF token")]
    InvalidCsrf,

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::PathEscape
                | Error::NotFound(_)
                | Error::UnsupportedType
                | Error::Unauthenticated
                | Error::InvalidCsrf
        )
    }
}
