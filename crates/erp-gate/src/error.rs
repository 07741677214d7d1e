//! Caller-facing error taxonomy

use std::fmt;

use transport::{StatusCode, TransportError};

/// Why a request ended with `AuthExpired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiredReason {
    /// 401 while no token was stored; nothing to refresh with
    NoToken,
    /// This caller ran the refresh and it was rejected or timed out
    RefreshFailed,
    /// Another caller's refresh failed (or the user logged out) while waiting
    SessionEnded,
    /// The replay with the refreshed token was rejected again
    ReplayRejected,
}

impl fmt::Display for ExpiredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExpiredReason::NoToken => "no access token",
            ExpiredReason::RefreshFailed => "token refresh failed",
            ExpiredReason::SessionEnded => "session ended during refresh",
            ExpiredReason::ReplayRejected => "refreshed token rejected",
        };
        f.write_str(text)
    }
}

/// Errors returned by `AuthClient::execute`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Terminal authentication failure; the session is over
    #[error("authentication expired: {0}")]
    AuthExpired(ExpiredReason),

    /// Network-level failure; never triggers a refresh
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Non-401 HTTP error (or a 401 from an auth endpoint), returned verbatim
    #[error("upstream returned {status}: {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        body: serde_json::Value,
    },

    #[error(transparent)]
    Session(#[from] erp_auth::Error),
}

impl Error {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Error::AuthExpired(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Upstream { status, .. } => Some(*status),
            Error::AuthExpired(_) => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }
}

/// Result alias for gate operations.
pub type Result<T> = std::result::Result<T, Error>;
