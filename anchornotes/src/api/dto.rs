//! Request/response bodies of the HTTP API.
//!
//! Field names are camelCase on the wire. These types are shared by the
//! server handlers and [`crate::client::ApiClient`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    note_geofence_id, Attachment, GeofenceRegistration, NewGeofence, NewNote, Note, Tag,
};

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /api/notes/relevant-notes`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelevantNotesRequest {
    /// The client's current instant, ISO-8601.
    pub now_utc: DateTime<Utc>,
    /// Geofence ids the device is currently inside, e.g. `"note_12"`.
    /// Unknown or foreign ids are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inside_geofence_ids: Option<Vec<String>>,
}

/// Request body for `PUT /api/notes/{id}/reminder/time`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeReminderRequest {
    pub trigger_at_utc: DateTime<Utc>,
}

/// Request body for `PUT /api/notes/{id}/reminder/geofence`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceReminderRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in meters, must be positive.
    pub radius: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_name: Option<String>,
}

impl From<GeofenceReminderRequest> for NewGeofence {
    fn from(req: GeofenceReminderRequest) -> Self {
        Self {
            latitude: req.latitude,
            longitude: req.longitude,
            radius_meters: req.radius,
            address_name: req.address_name,
        }
    }
}

/// Request body for `POST /api/notes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pinned: bool,
    /// Tag names; created for the user if they do not exist yet.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_at_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geofence: Option<GeofenceReminderRequest>,
}

impl From<CreateNoteRequest> for NewNote {
    fn from(req: CreateNoteRequest) -> Self {
        Self {
            title: req.title,
            text: req.text,
            pinned: req.pinned,
            tags: req.tags,
            reminder_time: req.reminder_at_utc,
            geofence: req.geofence.map(Into::into),
        }
    }
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceResponse {
    /// Device-level geofence id, `note_<noteId>`.
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: i64,
    pub address_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub id: i64,
    pub url: String,
    pub duration_sec: Option<i64>,
}

impl From<Attachment> for MediaResponse {
    fn from(attachment: Attachment) -> Self {
        Self {
            id: attachment.id,
            url: attachment.url,
            duration_sec: attachment.duration_sec,
        }
    }
}

/// A note with everything a client needs to render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub last_edited: DateTime<Utc>,
    pub tags: Vec<TagResponse>,
    pub geofence: Option<GeofenceResponse>,
    pub reminder_time_utc: Option<DateTime<Utc>>,
    pub image: Option<MediaResponse>,
    pub audio: Option<MediaResponse>,
    pub has_photo: bool,
    pub has_audio: bool,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        let geofence = note.geofence.map(|g| GeofenceResponse {
            id: note_geofence_id(note.id),
            latitude: g.latitude,
            longitude: g.longitude,
            radius: g.radius_meters,
            address_name: g.address_name,
        });

        Self {
            id: note.id,
            title: note.title,
            text: note.text,
            pinned: note.pinned,
            created_at: note.created_at,
            last_edited: note.last_edited,
            tags: note.tags.into_iter().map(Into::into).collect(),
            geofence,
            reminder_time_utc: note.reminder_time,
            has_photo: note.image.is_some(),
            has_audio: note.audio.is_some(),
            image: note.image.map(Into::into),
            audio: note.audio.map(Into::into),
        }
    }
}

/// Response of `PUT /api/notes/{id}/reminder/time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeReminderResponse {
    pub note_id: i64,
    pub reminder_time_utc: DateTime<Utc>,
}

/// One entry of `GET /api/geofences`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceRegistrationResponse {
    pub geofence_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: i64,
}

impl From<GeofenceRegistration> for GeofenceRegistrationResponse {
    fn from(reg: GeofenceRegistration) -> Self {
        Self {
            geofence_id: reg.geofence_id,
            latitude: reg.latitude,
            longitude: reg.longitude,
            radius_meters: reg.radius_meters,
        }
    }
}
