use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// Request-layer outcomes that end a request before normal handling
#[derive(Debug)]
pub enum ServiceError {
    /// The client key is on the blocklist
    Blocked(String),
    /// An operator action referenced a key that is not present
    NotFound(String),
    /// Internal service error
    InternalError(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Blocked(msg) => write!(f, "IP blocked: {}", msg),
            ServiceError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServiceError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Blocked(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Converts a guard error into a service error
impl From<crate::utils::GuardError> for ServiceError {
    fn from(error: crate::utils::GuardError) -> Self {
        ServiceError::InternalError(error.to_string())
    }
}
