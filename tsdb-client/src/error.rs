use std::fmt;

use thiserror::Error;

/// Failure reported by the TSDB service itself.
///
/// Built from the JSON error envelope (`code`, `message`, `requestId`) the
/// service returns with any status of 400 or above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub status: u16,
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Code: {}; Message: {}; RequestId: {}] (status {})",
            self.code,
            self.message,
            self.request_id.as_deref().unwrap_or("-"),
            self.status
        )
    }
}

/// Errors that can occur when talking to the TSDB service.
#[derive(Debug, Error)]
pub enum TsdbError {
    /// The endpoint is not an absolute URL with a scheme and host.
    #[error("Invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    /// Access key or secret key rejected.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// Any other client construction problem (proxy, TLS backend, env).
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Request payload could not be encoded. Nothing was sent.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// The signer refused its inputs.
    #[error("Signing error: {message}")]
    Signing { message: String },

    /// Connection, DNS or timeout failure.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The service answered with an error envelope.
    #[error("Service error: {0}")]
    Service(ServiceError),

    /// A successful response body did not have the expected shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String },
}

impl TsdbError {
    /// Returns true if this error is transient and the request may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            TsdbError::Network { .. } => true,
            TsdbError::Service(err) => {
                matches!(err.status, 429 | 500 | 502 | 503) || err.code == "RequestExpired"
            }
            _ => false,
        }
    }

    /// HTTP status of a service error.
    pub fn status(&self) -> Option<u16> {
        match self {
            TsdbError::Service(err) => Some(err.status),
            _ => None,
        }
    }

    /// The service error, if this is one.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            TsdbError::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ServiceError> for TsdbError {
    fn from(err: ServiceError) -> Self {
        TsdbError::Service(err)
    }
}

/// Result type for TSDB client operations.
pub type Result<T> = std::result::Result<T, TsdbError>;
