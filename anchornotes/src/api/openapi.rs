use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AnchorNotes API",
        version = "1.0.0",
        description = "Time and location reminders for notes, and the query that decides which notes are relevant right now.",
    ),
    paths(
        handlers::health::health_check,
        handlers::relevance::relevant_notes,
        handlers::geofences::list_geofences,
        handlers::notes::create_note,
        handlers::notes::get_note,
        handlers::notes::set_time_reminder,
        handlers::notes::set_geofence_reminder,
        handlers::notes::clear_reminders,
    ),
    components(schemas(
        response::ErrorCode,
        response::ApiError,
        response::ErrorBody,
        dto::RelevantNotesRequest,
        dto::TimeReminderRequest,
        dto::GeofenceReminderRequest,
        dto::CreateNoteRequest,
        dto::NoteResponse,
        dto::TagResponse,
        dto::GeofenceResponse,
        dto::MediaResponse,
        dto::TimeReminderResponse,
        dto::GeofenceRegistrationResponse,
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "relevance", description = "Which notes matter right now"),
        (name = "geofences", description = "Geofence registration feed for devices"),
        (name = "notes", description = "Note creation and lookup"),
        (name = "reminders", description = "Time and geofence reminders"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
