use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::{AnchorError, Result};
use crate::models::{Attachment, AttachmentKind, Geofence, NewGeofence, NewNote, Note};

use super::{
    from_db_timestamp, numbered_placeholders, to_db_timestamp, GeofenceRepository, TagRepository,
};

const NOTE_COLUMNS: &str = r#"
    n.id, n.user_id, n.title, n.text, n.pinned, n.created_at, n.last_edited, n.reminder_time,
    g.id, g.user_id, g.latitude, g.longitude, g.radius, g.address_name,
    i.id, i.kind, i.media_url, i.media_type, i.duration_sec,
    a.id, a.kind, a.media_url, a.media_type, a.duration_sec
"#;

const NOTE_JOINS: &str = r#"
    FROM notes n
    LEFT JOIN geofences g ON g.id = n.geofence_id
    LEFT JOIN attachments i ON i.id = n.image_id
    LEFT JOIN attachments a ON a.id = n.audio_id
"#;

pub struct NoteRepository;

impl NoteRepository {
    pub async fn create(
        conn: &Connection,
        user_id: &str,
        note: &NewNote,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let tx = conn.transaction().await?;

        let geofence_id = match &note.geofence {
            Some(geofence) => Some(GeofenceRepository::create(&tx, user_id, geofence, now).await?),
            None => None,
        };

        tx.execute(
            r#"
            INSERT INTO notes (
                user_id, title, text, pinned, created_at, last_edited, reminder_time, geofence_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?7)
            "#,
            params![
                user_id,
                note.title.clone(),
                note.text.clone(),
                note.pinned as i64,
                to_db_timestamp(&now),
                note.reminder_time.as_ref().map(to_db_timestamp),
                geofence_id,
            ],
        )
        .await?;
        let note_id = tx.last_insert_rowid();

        for name in &note.tags {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let tag_id = TagRepository::upsert(&tx, user_id, name).await?;
            TagRepository::attach(&tx, note_id, tag_id).await?;
        }

        tx.commit().await?;
        Ok(note_id)
    }

    pub async fn get_for_user(
        conn: &Connection,
        user_id: &str,
        note_id: i64,
    ) -> Result<Option<Note>> {
        let sql = format!("SELECT {NOTE_COLUMNS} {NOTE_JOINS} WHERE n.id = ?1 AND n.user_id = ?2");
        let mut notes = Self::query_notes(conn, &sql, vec![note_id.into(), user_id.into()]).await?;
        Ok(notes.pop())
    }

    /// The user's notes whose reminder time falls inside `[start, end]`
    /// (inclusive), most recently edited first.
    pub async fn find_time_relevant(
        conn: &Connection,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Note>> {
        let sql = format!(
            r#"
            SELECT {NOTE_COLUMNS} {NOTE_JOINS}
            WHERE n.user_id = ?1
              AND n.reminder_time IS NOT NULL
              AND n.reminder_time BETWEEN ?2 AND ?3
            ORDER BY n.last_edited DESC, n.id DESC
            "#
        );
        Self::query_notes(
            conn,
            &sql,
            vec![
                user_id.into(),
                to_db_timestamp(&start).into(),
                to_db_timestamp(&end).into(),
            ],
        )
        .await
    }

    /// The user's notes among `note_ids` that still carry a geofence.
    /// Ids belonging to other users are silently dropped by the owner filter.
    pub async fn find_geofenced_by_ids(
        conn: &Connection,
        user_id: &str,
        note_ids: &[i64],
    ) -> Result<Vec<Note>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {NOTE_COLUMNS} {NOTE_JOINS}
            WHERE n.user_id = ?1
              AND n.geofence_id IS NOT NULL
              AND n.id IN ({})
            ORDER BY n.last_edited DESC, n.id DESC
            "#,
            numbered_placeholders(2, note_ids.len())
        );
        let mut params: Vec<libsql::Value> = vec![user_id.into()];
        params.extend(note_ids.iter().map(|id| libsql::Value::from(*id)));

        Self::query_notes(conn, &sql, params).await
    }

    /// Returns `false` when the note does not exist or belongs to someone else.
    pub async fn set_reminder_time(
        conn: &Connection,
        user_id: &str,
        note_id: i64,
        reminder_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = conn
            .execute(
                r#"
                UPDATE notes SET reminder_time = ?3, last_edited = ?4
                WHERE id = ?1 AND user_id = ?2
                "#,
                params![
                    note_id,
                    user_id,
                    to_db_timestamp(&reminder_time),
                    to_db_timestamp(&now),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    /// Attach a fresh geofence row to the note. The time reminder is left as
    /// is; a geofence row no longer referenced by any note is removed.
    pub async fn set_geofence(
        conn: &Connection,
        user_id: &str,
        note_id: i64,
        geofence: &NewGeofence,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let tx = conn.transaction().await?;

        let Some(previous) = Self::current_geofence_id(&tx, user_id, note_id).await? else {
            tx.rollback().await?;
            return Ok(false);
        };

        let geofence_id = GeofenceRepository::create(&tx, user_id, geofence, now).await?;
        tx.execute(
            r#"
            UPDATE notes SET geofence_id = ?3, last_edited = ?4
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![note_id, user_id, geofence_id, to_db_timestamp(&now)],
        )
        .await?;

        if let Some(previous) = previous {
            GeofenceRepository::delete_if_orphaned(&tx, previous).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Clear the time reminder and the geofence in one statement.
    pub async fn clear_reminders(
        conn: &Connection,
        user_id: &str,
        note_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let tx = conn.transaction().await?;

        let Some(previous) = Self::current_geofence_id(&tx, user_id, note_id).await? else {
            tx.rollback().await?;
            return Ok(false);
        };

        tx.execute(
            r#"
            UPDATE notes SET reminder_time = NULL, geofence_id = NULL, last_edited = ?3
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![note_id, user_id, to_db_timestamp(&now)],
        )
        .await?;

        if let Some(previous) = previous {
            GeofenceRepository::delete_if_orphaned(&tx, previous).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// `None` if the note is not the user's, `Some(None)` if it has no geofence.
    async fn current_geofence_id(
        conn: &Connection,
        user_id: &str,
        note_id: i64,
    ) -> Result<Option<Option<i64>>> {
        let mut rows = conn
            .query(
                "SELECT geofence_id FROM notes WHERE id = ?1 AND user_id = ?2",
                params![note_id, user_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<Option<i64>>(0)?)),
            None => Ok(None),
        }
    }

    async fn query_notes(
        conn: &Connection,
        sql: &str,
        params: Vec<libsql::Value>,
    ) -> Result<Vec<Note>> {
        let mut rows = conn.query(sql, libsql::params_from_iter(params)).await?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(Self::row_to_note(&row)?);
        }

        let ids: Vec<i64> = notes.iter().map(|n| n.id).collect();
        let mut tags = TagRepository::for_notes(conn, &ids).await?;
        for note in &mut notes {
            note.tags = tags.remove(&note.id).unwrap_or_default();
        }
        Ok(notes)
    }

    fn row_to_note(row: &libsql::Row) -> Result<Note> {
        let created_at = row.get::<String>(5)?;
        let last_edited = row.get::<String>(6)?;

        let geofence = match row.get::<Option<i64>>(8)? {
            Some(id) => Some(Geofence {
                id,
                user_id: row.get(9)?,
                latitude: row.get(10)?,
                longitude: row.get(11)?,
                radius_meters: row.get(12)?,
                address_name: row.get(13)?,
            }),
            None => None,
        };

        Ok(Note {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            text: row.get(3)?,
            pinned: row.get::<i64>(4)? != 0,
            created_at: from_db_timestamp(&created_at).ok_or_else(|| {
                AnchorError::Internal(format!("Corrupt created_at timestamp: {created_at}"))
            })?,
            last_edited: from_db_timestamp(&last_edited).ok_or_else(|| {
                AnchorError::Internal(format!("Corrupt last_edited timestamp: {last_edited}"))
            })?,
            reminder_time: row
                .get::<Option<String>>(7)?
                .as_deref()
                .and_then(from_db_timestamp),
            geofence,
            tags: Vec::new(),
            image: Self::row_to_attachment(row, 14)?,
            audio: Self::row_to_attachment(row, 19)?,
        })
    }

    fn row_to_attachment(row: &libsql::Row, offset: i32) -> Result<Option<Attachment>> {
        let Some(id) = row.get::<Option<i64>>(offset)? else {
            return Ok(None);
        };
        let kind = row
            .get::<String>(offset + 1)?
            .parse()
            .unwrap_or(AttachmentKind::Photo);
        Ok(Some(Attachment {
            id,
            kind,
            url: row.get(offset + 2)?,
            media_type: row.get(offset + 3)?,
            duration_sec: row.get(offset + 4)?,
        }))
    }
}
