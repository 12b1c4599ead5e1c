use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{note_geofence_id, Attachment, Geofence, NewGeofence};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
}

/// A fully loaded note: reminder state plus the tags, geofence and
/// attachments that a client renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub text: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub last_edited: DateTime<Utc>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub geofence: Option<Geofence>,
    pub tags: Vec<Tag>,
    pub image: Option<Attachment>,
    pub audio: Option<Attachment>,
}

impl Note {
    /// The device-level geofence id, if the note has a location reminder.
    pub fn geofence_id(&self) -> Option<String> {
        self.geofence.as_ref().map(|_| note_geofence_id(self.id))
    }

    pub fn has_reminder(&self) -> bool {
        self.reminder_time.is_some() || self.geofence.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub text: String,
    pub pinned: bool,
    pub tags: Vec<String>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub geofence: Option<NewGeofence>,
}

/// Timestamps are stored as fixed-width RFC 3339 text, which only sorts
/// chronologically for four-digit years.
pub fn is_storable_timestamp(dt: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&dt.year())
}
