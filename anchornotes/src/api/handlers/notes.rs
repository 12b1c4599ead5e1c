//! Note and reminder handlers.

use axum::extract::{Path, State};

use crate::api::dto::{
    CreateNoteRequest, GeofenceReminderRequest, NoteResponse, TimeReminderRequest,
    TimeReminderResponse,
};
use crate::api::response::{ApiResponse, ErrorBody};
use crate::api::{AppJson, AppState, AuthUser};

/// `POST /api/notes`
#[utoipa::path(
    post,
    path = "/api/notes",
    tag = "notes",
    operation_id = "notes.create",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
    )
)]
pub async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<CreateNoteRequest>,
) -> ApiResponse<NoteResponse> {
    match state.notes.create_note(user.id(), req.into()).await {
        Ok(note) => ApiResponse::created(note.into()),
        Err(e) => e.into(),
    }
}

/// `GET /api/notes/{id}`
#[utoipa::path(
    get,
    path = "/api/notes/{id}",
    tag = "notes",
    operation_id = "notes.get",
    params(("id" = i64, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note found", body = NoteResponse),
        (status = 404, description = "Note not found", body = ErrorBody),
    )
)]
pub async fn get_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResponse<NoteResponse> {
    match state.notes.get_note(user.id(), id).await {
        Ok(note) => ApiResponse::success(note.into()),
        Err(e) => e.into(),
    }
}

/// `PUT /api/notes/{id}/reminder/time`
#[utoipa::path(
    put,
    path = "/api/notes/{id}/reminder/time",
    tag = "reminders",
    operation_id = "reminders.setTime",
    params(("id" = i64, Path, description = "Note ID")),
    request_body = TimeReminderRequest,
    responses(
        (status = 200, description = "Reminder time set", body = TimeReminderResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Note not found", body = ErrorBody),
    )
)]
pub async fn set_time_reminder(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<TimeReminderRequest>,
) -> ApiResponse<TimeReminderResponse> {
    match state
        .notes
        .set_time_reminder(user.id(), id, req.trigger_at_utc)
        .await
    {
        Ok(reminder_time_utc) => ApiResponse::success(TimeReminderResponse {
            note_id: id,
            reminder_time_utc,
        }),
        Err(e) => e.into(),
    }
}

/// `PUT /api/notes/{id}/reminder/geofence`
#[utoipa::path(
    put,
    path = "/api/notes/{id}/reminder/geofence",
    tag = "reminders",
    operation_id = "reminders.setGeofence",
    params(("id" = i64, Path, description = "Note ID")),
    request_body = GeofenceReminderRequest,
    responses(
        (status = 200, description = "Geofence attached; the updated note", body = NoteResponse),
        (status = 400, description = "Invalid coordinates or radius", body = ErrorBody),
        (status = 404, description = "Note not found", body = ErrorBody),
    )
)]
pub async fn set_geofence_reminder(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    AppJson(req): AppJson<GeofenceReminderRequest>,
) -> ApiResponse<NoteResponse> {
    match state
        .notes
        .set_geofence_reminder(user.id(), id, req.into())
        .await
    {
        Ok(note) => ApiResponse::success(note.into()),
        Err(e) => e.into(),
    }
}

/// `DELETE /api/notes/{id}/reminder`
///
/// Clears the time reminder and the geofence together.
#[utoipa::path(
    delete,
    path = "/api/notes/{id}/reminder",
    tag = "reminders",
    operation_id = "reminders.clear",
    params(("id" = i64, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Reminders cleared"),
        (status = 404, description = "Note not found", body = ErrorBody),
    )
)]
pub async fn clear_reminders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResponse<()> {
    match state.notes.clear_reminders(user.id(), id).await {
        Ok(()) => ApiResponse::no_content(),
        Err(e) => e.into(),
    }
}
