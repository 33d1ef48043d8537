//! Error types for Imprint

use hyper::StatusCode;

/// Main error type for Imprint operations
///
/// Storage and network failures are converted into this taxonomy at the
/// component boundary; raw transport errors never reach route handlers or
/// session callers.
#[derive(Debug, thiserror::Error)]
pub enum ImprintError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Version counter malformed: {0}")]
    VersionFormat(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImprintError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PublishFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RemoteUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::VersionFormat(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP responses
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

impl From<std::io::Error> for ImprintError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ImprintError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for ImprintError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<reqwest::Error> for ImprintError {
    fn from(err: reqwest::Error) -> Self {
        Self::Store(err.to_string())
    }
}

/// Result type alias for Imprint operations
pub type Result<T> = std::result::Result<T, ImprintError>;
