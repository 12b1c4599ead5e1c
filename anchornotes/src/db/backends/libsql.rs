use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::connection::Database;
use crate::db::repository::{GeofenceRepository, NoteRepository};
use crate::db::traits::{DatabaseBackend, GeofenceStore, NoteStore};
use crate::error::Result;
use crate::models::{GeofenceRegistration, NewGeofence, NewNote, Note};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NoteStore for LibSqlBackend {
    async fn create_note(&self, user_id: &str, note: &NewNote, now: DateTime<Utc>) -> Result<i64> {
        let conn = self.db.connect().await?;
        NoteRepository::create(&conn, user_id, note, now).await
    }
    async fn get_note(&self, user_id: &str, note_id: i64) -> Result<Option<Note>> {
        let conn = self.db.connect().await?;
        NoteRepository::get_for_user(&conn, user_id, note_id).await
    }
    async fn find_time_relevant_notes(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Note>> {
        let conn = self.db.connect().await?;
        NoteRepository::find_time_relevant(&conn, user_id, start, end).await
    }
    async fn find_geofenced_notes(&self, user_id: &str, note_ids: &[i64]) -> Result<Vec<Note>> {
        let conn = self.db.connect().await?;
        NoteRepository::find_geofenced_by_ids(&conn, user_id, note_ids).await
    }
    async fn set_reminder_time(
        &self,
        user_id: &str,
        note_id: i64,
        reminder_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.db.connect().await?;
        NoteRepository::set_reminder_time(&conn, user_id, note_id, reminder_time, now).await
    }
    async fn set_geofence(
        &self,
        user_id: &str,
        note_id: i64,
        geofence: &NewGeofence,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.db.connect().await?;
        NoteRepository::set_geofence(&conn, user_id, note_id, geofence, now).await
    }
    async fn clear_reminders(
        &self,
        user_id: &str,
        note_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.db.connect().await?;
        NoteRepository::clear_reminders(&conn, user_id, note_id, now).await
    }
}

#[async_trait]
impl GeofenceStore for LibSqlBackend {
    async fn list_geofence_registrations(
        &self,
        user_id: &str,
    ) -> Result<Vec<GeofenceRegistration>> {
        let conn = self.db.connect().await?;
        GeofenceRepository::list_for_registration(&conn, user_id).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}
