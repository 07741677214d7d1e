//! Argument value errors

use thiserror::Error;

/// Values `erp-console` could not turn into a request.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages_are_descriptive() {
        assert_eq!(
            Error::InvalidMethod("FE TCH".into()).to_string(),
            "invalid HTTP method: FE TCH"
        );
        assert!(
            Error::InvalidBody("expected value".into())
                .to_string()
                .contains("expected value")
        );
    }
}
