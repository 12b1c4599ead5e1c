//! Relevance query handler.

use axum::extract::State;

use crate::api::dto::{NoteResponse, RelevantNotesRequest};
use crate::api::response::{ApiResponse, ErrorBody};
use crate::api::{AppJson, AppState, AuthUser};

/// `POST /api/notes/relevant-notes`
///
/// Notes whose reminder falls within the relevance window around `nowUtc`,
/// plus notes whose geofence the device reports being inside.
#[utoipa::path(
    post,
    path = "/api/notes/relevant-notes",
    tag = "relevance",
    operation_id = "notes.relevant",
    request_body = RelevantNotesRequest,
    responses(
        (status = 200, description = "Relevant notes, most recently edited first", body = [NoteResponse]),
        (status = 400, description = "Missing or malformed nowUtc", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
    )
)]
pub async fn relevant_notes(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<RelevantNotesRequest>,
) -> ApiResponse<Vec<NoteResponse>> {
    let inside = req.inside_geofence_ids.unwrap_or_default();
    match state
        .relevance
        .relevant_notes(user.id(), req.now_utc, &inside)
        .await
    {
        Ok(notes) => ApiResponse::success(notes.into_iter().map(NoteResponse::from).collect()),
        Err(e) => e.into(),
    }
}
