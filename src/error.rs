/// Error types for the image service
///
/// Every failure the resize/upload pipeline can produce maps onto one of
/// these variants, which in turn map onto HTTP responses for API clients.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Result type for image-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Input bytes could not be decoded into an image
    #[error("decode error: {0}")]
    Decode(String),

    /// One or more resize branches failed
    #[error("resize error: {0}")]
    Resize(String),

    /// Upload to the object store failed
    #[error("upload error: {0}")]
    Upload(String),

    /// Invalid or missing configuration at construction time
    #[error("config error: {0}")]
    Config(String),

    /// Malformed client request
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Decode(_)
            | AppError::Resize(_)
            | AppError::Upload(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "message": self.to_string() }))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("background task failed: {err}"))
    }
}
