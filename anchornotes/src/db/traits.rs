use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{GeofenceRegistration, NewGeofence, NewNote, Note};

/// Note reads and reminder mutations. Every call is scoped to one user;
/// a note owned by someone else behaves exactly like a missing note.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn create_note(&self, user_id: &str, note: &NewNote, now: DateTime<Utc>) -> Result<i64>;
    async fn get_note(&self, user_id: &str, note_id: i64) -> Result<Option<Note>>;
    async fn find_time_relevant_notes(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Note>>;
    async fn find_geofenced_notes(&self, user_id: &str, note_ids: &[i64]) -> Result<Vec<Note>>;

    /// Returns `false` if the note is not found for this user.
    async fn set_reminder_time(
        &self,
        user_id: &str,
        note_id: i64,
        reminder_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    async fn set_geofence(
        &self,
        user_id: &str,
        note_id: i64,
        geofence: &NewGeofence,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    async fn clear_reminders(&self, user_id: &str, note_id: i64, now: DateTime<Utc>)
        -> Result<bool>;
}

#[async_trait]
pub trait GeofenceStore: Send + Sync {
    async fn list_geofence_registrations(&self, user_id: &str)
        -> Result<Vec<GeofenceRegistration>>;
}

#[async_trait]
pub trait DatabaseBackend: NoteStore + GeofenceStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;
}
