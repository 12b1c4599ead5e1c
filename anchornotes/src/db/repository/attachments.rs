use chrono::Utc;
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::AttachmentKind;

use super::to_db_timestamp;

pub struct AttachmentRepository;

impl AttachmentRepository {
    pub async fn create(
        conn: &Connection,
        user_id: &str,
        kind: AttachmentKind,
        media_url: &str,
        media_type: Option<&str>,
        duration_sec: Option<i64>,
    ) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO attachments (user_id, kind, media_url, media_type, duration_sec, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                user_id,
                kind.to_string(),
                media_url,
                media_type.map(str::to_string),
                duration_sec,
                to_db_timestamp(&Utc::now()),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    /// Link an attachment to the note's photo or audio slot. Only links within
    /// the same user succeed.
    pub async fn link_to_note(
        conn: &Connection,
        user_id: &str,
        note_id: i64,
        attachment_id: i64,
        kind: AttachmentKind,
    ) -> Result<bool> {
        let column = match kind {
            AttachmentKind::Photo => "image_id",
            AttachmentKind::Audio => "audio_id",
        };
        let sql = format!(
            r#"
            UPDATE notes SET {column} = ?3
            WHERE id = ?2 AND user_id = ?1
              AND EXISTS (SELECT 1 FROM attachments WHERE id = ?3 AND user_id = ?1)
            "#
        );
        let affected = conn
            .execute(&sql, params![user_id, note_id, attachment_id])
            .await?;
        Ok(affected > 0)
    }
}
