//! Error types for rchat-ai

use std::time::Duration;
use thiserror::Error;

/// Result type alias using rchat-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the generation service
#[derive(Error, Debug)]
pub enum Error {
    /// API returned an error response
    #[error("API error: {message} (status: {status})")]
    Api { status: String, message: String },

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// The service answered without any usable text
    #[error("Empty response from the service")]
    EmptyResponse,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from a status and message
    pub fn api(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Check if the service rejected the prompt itself rather than failing
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Error::Api { status, message } => {
                let status = status.to_uppercase();
                status == "INVALID_ARGUMENT"
                    || status == "400"
                    || message.to_lowercase().contains("invalid argument")
            }
            _ => false,
        }
    }
}

/// Failure reported by a [`crate::ResponseGateway`].
///
/// Every absence of a usable reply (transport failure, API error, empty body,
/// timeout) collapses to `Unavailable`; only prompts the service explicitly
/// rejects are reported as `InputInvalid`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network/service failure or empty response
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the prompt
    #[error("invalid input: {0}")]
    InputInvalid(String),
}

impl GatewayError {
    /// Create an `Unavailable` error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// The error used when a request outlives its deadline
    pub fn timed_out(after: Duration) -> Self {
        Self::Unavailable(format!("request timed out after {:?}", after))
    }
}

impl From<Error> for GatewayError {
    fn from(error: Error) -> Self {
        if error.is_invalid_input() {
            GatewayError::InputInvalid(error.to_string())
        } else {
            GatewayError::Unavailable(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_status_is_invalid_input() {
        let e = Error::api("INVALID_ARGUMENT", "Request contains an invalid argument.");
        assert!(e.is_invalid_input());
        assert!(matches!(GatewayError::from(e), GatewayError::InputInvalid(_)));
    }

    #[test]
    fn test_invalid_argument_message_is_invalid_input() {
        let e = Error::api("error", "Invalid argument: contents is empty");
        assert!(e.is_invalid_input());
    }

    #[test]
    fn test_server_errors_are_unavailable() {
        let e = Error::api("UNAVAILABLE", "The model is overloaded.");
        assert!(!e.is_invalid_input());
        assert!(matches!(GatewayError::from(e), GatewayError::Unavailable(_)));
    }

    #[test]
    fn test_non_api_errors_are_unavailable() {
        for e in [
            Error::EmptyResponse,
            Error::InvalidApiKey,
            Error::Sse("connection reset".into()),
        ] {
            assert!(matches!(GatewayError::from(e), GatewayError::Unavailable(_)));
        }
    }

    #[test]
    fn test_timed_out_is_unavailable() {
        let e = GatewayError::timed_out(Duration::from_secs(30));
        assert_eq!(e, GatewayError::Unavailable("request timed out after 30s".into()));
    }

    #[test]
    fn test_sub_second_timeout_keeps_its_unit() {
        let e = GatewayError::timed_out(Duration::from_millis(250));
        assert_eq!(e.to_string(), "service unavailable: request timed out after 250ms");
    }
}
