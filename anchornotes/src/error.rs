use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::ApiResponse;

#[derive(Error, Debug)]
pub enum AnchorError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AnchorError {
    /// Whether a client call that failed with this error may succeed if
    /// retried later. Local state is never touched by a failed call, so
    /// retrying is always safe; this only says whether it is worthwhile.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnchorError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            AnchorError::Api { status, .. } => *status >= 500 || *status == 429,
            AnchorError::Io(_) => true,
            _ => false,
        }
    }
}

impl From<validator::ValidationErrors> for AnchorError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AnchorError::Validation(errors.to_string())
    }
}

impl IntoResponse for AnchorError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AnchorError>;
