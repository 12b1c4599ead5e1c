//! # Bearer Token Authentication
//!
//! Token issuance and verification are handled by the identity service in
//! front of this API; here a token is an opaque key into the
//! `ANCHOR_API_TOKENS` table that names the user it acts for. The resolved
//! [`AuthUser`] is stored in the request extensions for handlers to extract.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::extractors::AuthUser;
use crate::api::state::AppState;

use super::response::{ApiResponse, ErrorCode};

/// Axum middleware that resolves `Authorization: Bearer <token>` to a user.
///
/// - No tokens configured → 401. The server still starts, but protected
///   routes are locked down.
/// - Missing or malformed header → 401.
/// - Unknown token → 401.
/// - Known token → request continues with an [`AuthUser`] extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if state.config.server.api_tokens.is_empty() {
        return ApiResponse::<()>::error(
            ErrorCode::Unauthorized,
            "API tokens not configured. Set ANCHOR_API_TOKENS to enable access.",
        )
        .into_response();
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => h[7..].trim(),
        Some(_) => {
            return ApiResponse::<()>::error(
                ErrorCode::Unauthorized,
                "Invalid authorization header format. Expected: Bearer <token>",
            )
            .into_response();
        }
        None => {
            return ApiResponse::<()>::error(
                ErrorCode::Unauthorized,
                "Missing authorization header",
            )
            .into_response();
        }
    };

    match state.config.server.api_tokens.get(token) {
        Some(user_id) => {
            let user = AuthUser(user_id.clone());
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => ApiResponse::<()>::error(ErrorCode::Unauthorized, "Invalid API token")
            .into_response(),
    }
}
