//! # Response & Error Contract
//!
//! Successful responses carry the resource itself as the JSON body (a note,
//! an array of notes, an array of geofence registrations) with no wrapper.
//! `204 No Content` responses have no body at all.
//!
//! Every error, regardless of endpoint, uses one shape:
//!
//! ```json
//! { "error": { "code": "invalid_request", "message": "Missing required field: nowUtc" } }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AnchorError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"invalid_request"`).
/// Each variant maps to a fixed HTTP status code via [`ErrorCode::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request was malformed, had invalid parameters, or failed validation.
    /// HTTP 400.
    InvalidRequest,
    /// Missing or unknown bearer token. HTTP 401.
    Unauthorized,
    /// The note does not exist or is not owned by the caller. HTTP 404.
    NotFound,
    /// An unexpected server-side error occurred. Internal details are never
    /// leaked to the client. HTTP 500.
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not_found"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

/// Structured error payload.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to display to end users.
    pub message: String,
}

/// Top-level error body: `{ "error": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: ApiError,
}

#[derive(Debug)]
enum Body<T> {
    Data(T),
    Error(ApiError),
    Empty,
}

/// What every handler returns: a bare JSON resource, an error body, or
/// nothing, plus the status code to send it with.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    body: Body<T>,
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// HTTP 200 with `data` as the body.
    pub fn success(data: T) -> Self {
        Self {
            body: Body::Data(data),
            status: StatusCode::OK,
        }
    }

    /// HTTP 201 with `data` as the body.
    pub fn created(data: T) -> Self {
        Self {
            body: Body::Data(data),
            status: StatusCode::CREATED,
        }
    }

    /// HTTP 204, no body.
    pub fn no_content() -> Self {
        Self {
            body: Body::Empty,
            status: StatusCode::NO_CONTENT,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            body: Body::Error(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match self.body {
            Body::Data(data) => match serde_json::to_value(&data) {
                Ok(body) => (status, Json(body)).into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize response body");
                    ApiResponse::<()>::error(ErrorCode::InternalError, "An internal error occurred")
                        .into_response()
                }
            },
            Body::Error(error) => (status, Json(ErrorBody { error })).into_response(),
            Body::Empty => status.into_response(),
        }
    }
}

impl<T: Serialize> From<AnchorError> for ApiResponse<T> {
    /// Internal error details are **never** leaked to the client. For
    /// `internal_error` responses, a generic message is returned and the
    /// real error is logged via `tracing::error!`.
    fn from(err: AnchorError) -> Self {
        match err {
            AnchorError::NotFound(ref msg) => ApiResponse::error(ErrorCode::NotFound, msg.clone()),

            AnchorError::Validation(ref msg) => {
                ApiResponse::error(ErrorCode::InvalidRequest, msg.clone())
            }

            AnchorError::Unauthorized(ref msg) => {
                ApiResponse::error(ErrorCode::Unauthorized, msg.clone())
            }

            AnchorError::Json(ref e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            AnchorError::UrlParse(ref e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid URL: {e}"))
            }

            ref internal @ (AnchorError::Database(_)
            | AnchorError::Http(_)
            | AnchorError::Api { .. }
            | AnchorError::Io(_)
            | AnchorError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to API response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_body_is_bare_resource() {
        let response = ApiResponse::success(vec![1, 2, 3]).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn no_content_has_empty_body() {
        let response = ApiResponse::<()>::no_content().into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn internal_errors_are_not_leaked() {
        let response: ApiResponse<()> =
            AnchorError::Internal("secret connection string".to_string()).into();
        let response = response.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "internal_error");
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn validation_maps_to_invalid_request() {
        let response: ApiResponse<()> =
            AnchorError::Validation("Missing required field: nowUtc".to_string()).into();
        let response = response.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
        assert_eq!(json["error"]["message"], "Missing required field: nowUtc");
    }

    #[test]
    fn error_code_display_matches_wire_format() {
        for code in [
            ErrorCode::InvalidRequest,
            ErrorCode::Unauthorized,
            ErrorCode::NotFound,
            ErrorCode::InternalError,
        ] {
            let wire = serde_json::to_value(&code).unwrap();
            assert_eq!(wire, serde_json::Value::String(code.to_string()));
        }
    }
}
