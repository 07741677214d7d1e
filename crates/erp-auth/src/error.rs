//! Error types for session operations

use transport::{StatusCode, TransportError};

/// Errors from login, logout, refresh and token persistence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("auth endpoint rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("response carried no access token")]
    MissingToken,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("session parse error: {0}")]
    SessionParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
