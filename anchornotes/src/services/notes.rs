use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use validator::Validate;

use crate::db::DatabaseBackend;
use crate::error::{AnchorError, Result};
use crate::models::{is_storable_timestamp, NewGeofence, NewNote, Note};

/// Note creation, lookup and the reminder mutations that feed relevance.
#[derive(Clone)]
pub struct NoteService {
    db: Arc<dyn DatabaseBackend>,
}

impl NoteService {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }

    pub async fn create_note(&self, user_id: &str, note: NewNote) -> Result<Note> {
        if let Some(geofence) = &note.geofence {
            geofence.validate()?;
        }
        if let Some(reminder) = &note.reminder_time {
            check_reminder_time("reminderAtUtc", reminder)?;
        }
        let id = self.db.create_note(user_id, &note, Utc::now()).await?;
        info!(user_id, note_id = id, "Created note");
        self.get_note(user_id, id).await
    }

    pub async fn get_note(&self, user_id: &str, note_id: i64) -> Result<Note> {
        self.db
            .get_note(user_id, note_id)
            .await?
            .ok_or_else(|| not_found(note_id))
    }

    /// Leaves any geofence in place.
    pub async fn set_time_reminder(
        &self,
        user_id: &str,
        note_id: i64,
        trigger_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        check_reminder_time("triggerAtUtc", &trigger_at)?;
        if !self
            .db
            .set_reminder_time(user_id, note_id, trigger_at, Utc::now())
            .await?
        {
            return Err(not_found(note_id));
        }
        info!(user_id, note_id, %trigger_at, "Set time reminder");
        Ok(trigger_at)
    }

    /// Leaves any time reminder in place.
    pub async fn set_geofence_reminder(
        &self,
        user_id: &str,
        note_id: i64,
        geofence: NewGeofence,
    ) -> Result<Note> {
        geofence.validate()?;
        if !self
            .db
            .set_geofence(user_id, note_id, &geofence, Utc::now())
            .await?
        {
            return Err(not_found(note_id));
        }
        info!(user_id, note_id, radius = geofence.radius_meters, "Set geofence reminder");
        self.get_note(user_id, note_id).await
    }

    pub async fn clear_reminders(&self, user_id: &str, note_id: i64) -> Result<()> {
        if !self.db.clear_reminders(user_id, note_id, Utc::now()).await? {
            return Err(not_found(note_id));
        }
        info!(user_id, note_id, "Cleared reminders");
        Ok(())
    }
}

fn check_reminder_time(field: &str, at: &DateTime<Utc>) -> Result<()> {
    if is_storable_timestamp(at) {
        Ok(())
    } else {
        Err(AnchorError::Validation(format!(
            "{field} must be between years 0000 and 9999"
        )))
    }
}

fn not_found(note_id: i64) -> AnchorError {
    AnchorError::NotFound(format!("Note {note_id} not found"))
}
