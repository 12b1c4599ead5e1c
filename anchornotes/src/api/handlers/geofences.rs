use axum::extract::State;

use crate::api::dto::GeofenceRegistrationResponse;
use crate::api::response::{ApiResponse, ErrorBody};
use crate::api::{AppState, AuthUser};

/// `GET /api/geofences`
#[utoipa::path(
    get,
    path = "/api/geofences",
    tag = "geofences",
    operation_id = "geofences.list",
    responses(
        (status = 200, description = "Every geofence attached to the caller's notes", body = [GeofenceRegistrationResponse]),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
    )
)]
pub async fn list_geofences(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResponse<Vec<GeofenceRegistrationResponse>> {
    match state.geofences.registrations(user.id()).await {
        Ok(registrations) => ApiResponse::success(
            registrations
                .into_iter()
                .map(GeofenceRegistrationResponse::from)
                .collect(),
        ),
        Err(e) => e.into(),
    }
}
