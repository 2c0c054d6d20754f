use thiserror::Error;

/// Custom error types for the admission guard
#[derive(Error, Debug)]
pub enum GuardError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Geolocation lookup failed (unreachable, timeout or non-2xx)
    #[error("Geolocation lookup failed: {0}")]
    Resolution(String),

    /// Anomaly log could not be written
    #[error("Anomaly persistence failed: {0}")]
    Persistence(String),

    /// JSON encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for admission guard operations
pub type GuardResult<T> = Result<T, GuardError>;

impl From<reqwest::Error> for GuardError {
    fn from(err: reqwest::Error) -> Self {
        GuardError::Resolution(err.to_string())
    }
}

impl From<std::io::Error> for GuardError {
    fn from(err: std::io::Error) -> Self {
        GuardError::Persistence(err.to_string())
    }
}
