use thiserror::Error;

/// Result type alias for caniphish operations
pub type Result<T> = std::result::Result<T, CaniphishError>;

/// Errors that can occur when talking to the caniphish API
#[derive(Error, Debug)]
pub enum CaniphishError {
    /// DNS, connection or TLS failure that will not be retried
    #[error("transport error: {0}")]
    Transport(String),

    /// Every attempt failed with a retryable status or timeout
    #[error("giving up after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Number of requests issued
        attempts: u32,
        /// Description of the last failure
        last: String,
    },

    /// API answered with a non-retryable, non-success status
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Body was not JSON, or not a JSON object
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Output file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaniphishError {
    /// Returns the HTTP status code if this is an API error
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CaniphishError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_status() {
        let err = CaniphishError::Api {
            code: 401,
            message: "bad key".into(),
        };
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.to_string(), "API error (401): bad key");
    }

    #[test]
    fn json_errors_become_malformed_response() {
        let err: CaniphishError = serde_json::from_str::<serde_json::Value>("<html>")
            .unwrap_err()
            .into();
        assert!(matches!(err, CaniphishError::MalformedResponse(_)));
    }
}
