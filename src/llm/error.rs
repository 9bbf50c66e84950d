//! Error type for the Gemini API boundary
//!
//! Every vendor failure mode collapses into one tagged error here so the
//! rest of the application only ever matches on the kind.

use thiserror::Error;

/// Error returned by calls to the Gemini API.
#[derive(Debug, Error)]
pub enum LlmError {
    /// 4xx responses: invalid argument, bad API key, quota exhausted.
    #[error("client error ({status}): {message}")]
    Client { status: u16, message: String },

    /// 5xx responses: service-side failure.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network or protocol failure before a response body arrived.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl LlmError {
    /// Build the appropriate variant from an HTTP status and error message.
    pub fn from_status(status: u16, message: String) -> Self {
        if status < 500 {
            Self::Client { status, message }
        } else {
            Self::Api { status, message }
        }
    }

    /// True when the failure was the caller's fault (quota included).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Client { .. })
    }
}

pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(LlmError::from_status(429, "quota".into()).is_client_error());
        assert!(!LlmError::from_status(503, "overloaded".into()).is_client_error());
    }

    #[test]
    fn test_display_includes_status() {
        let err = LlmError::from_status(400, "temperature out of range".into());
        assert_eq!(err.to_string(), "client error (400): temperature out of range");
    }
}
