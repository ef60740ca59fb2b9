//! Domain error types
//!
//! The error hierarchy for the loader. All errors are domain-specific and
//! don't expose third-party types.

use thiserror::Error;

/// Main loader error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// ClinicalTrials.gov API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// Transformation errors (shape that passed validation but broke downstream)
    #[error("Transform error: {0}")]
    Transform(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Run cancelled by a shutdown signal
    #[error("Run cancelled by shutdown signal")]
    Cancelled,

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl EtlError {
    /// Whether a retry of the whole run is likely to succeed.
    ///
    /// Drives the CLI exit code: transient errors exit 1, fatal errors exit 2.
    pub fn is_transient(&self) -> bool {
        match self {
            EtlError::Api(api) => api.is_retryable(),
            EtlError::Database(_) => true,
            _ => false,
        }
    }
}

/// ClinicalTrials.gov API errors
///
/// Errors raised while fetching pages of studies from the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request exceeded the per-request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Failed to reach the API host
    #[error("Failed to connect to API: {0}")]
    ConnectionFailed(String),

    /// HTTP 429
    #[error("Rate limited by API (429)")]
    RateLimited,

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx other than 429), never retried
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Invalid response from API: {0}")]
    InvalidResponse(String),

    /// A page failed after all retry attempts were spent
    #[error("Page fetch failed after {attempts} attempts (page_token={page_token:?}): {last_error}")]
    RetriesExhausted {
        attempts: usize,
        page_token: Option<String>,
        last_error: String,
    },
}

impl ApiError {
    /// Whether this error class is worth retrying.
    ///
    /// Timeouts, connection failures, 429 and 5xx are retryable; all other
    /// 4xx responses and decode failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_)
                | ApiError::ConnectionFailed(_)
                | ApiError::RateLimited
                | ApiError::ServerError { .. }
                | ApiError::RetriesExhausted { .. }
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for EtlError {
    fn from(err: toml::de::Error) -> Self {
        EtlError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from tokio_postgres errors
impl From<tokio_postgres::Error> for EtlError {
    fn from(err: tokio_postgres::Error) -> Self {
        EtlError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etl_error_display() {
        let err = EtlError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_api_error_conversion() {
        let api_err = ApiError::RateLimited;
        let etl_err: EtlError = api_err.into();
        assert!(matches!(etl_err, EtlError::Api(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::Timeout("30s elapsed".to_string()).is_retryable());
        assert!(ApiError::RateLimited.is_retryable());
        assert!(ApiError::ServerError {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!ApiError::ClientError {
            status: 400,
            message: "bad request".to_string()
        }
        .is_retryable());
        assert!(!ApiError::InvalidResponse("truncated body".to_string()).is_retryable());
    }

    #[test]
    fn test_transient_maps_to_exit_one() {
        let err: EtlError = ApiError::ServerError {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(err.is_transient());

        let err: EtlError = ApiError::ClientError {
            status: 404,
            message: "gone".to_string(),
        }
        .into();
        assert!(!err.is_transient());

        assert!(EtlError::Database("connection reset".to_string()).is_transient());
        assert!(!EtlError::Configuration("missing dsn".to_string()).is_transient());
        assert!(!EtlError::Cancelled.is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let etl_err: EtlError = io_err.into();
        assert!(matches!(etl_err, EtlError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let etl_err: EtlError = json_err.into();
        assert!(matches!(etl_err, EtlError::Serialization(_)));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let err = EtlError::Other("test".to_string());
        let _: &dyn std::error::Error = &err;

        let err = ApiError::RateLimited;
        let _: &dyn std::error::Error = &err;
    }
}
