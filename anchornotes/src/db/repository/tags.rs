use std::collections::HashMap;

use libsql::{params, Connection};

use crate::error::Result;
use crate::models::Tag;

use super::numbered_placeholders;

pub struct TagRepository;

impl TagRepository {
    /// Return the id of the user's tag with this name, creating it if needed.
    pub async fn upsert(conn: &Connection, user_id: &str, name: &str) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO tags (user_id, name) VALUES (?1, ?2)
            ON CONFLICT (user_id, name) DO NOTHING
            "#,
            params![user_id, name],
        )
        .await?;

        let mut rows = conn
            .query(
                "SELECT id FROM tags WHERE user_id = ?1 AND name = ?2",
                params![user_id, name],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            crate::error::AnchorError::Internal(format!("Tag '{name}' vanished after upsert"))
        })?;
        Ok(row.get(0)?)
    }

    pub async fn attach(conn: &Connection, note_id: i64, tag_id: i64) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2)",
            params![note_id, tag_id],
        )
        .await?;
        Ok(())
    }

    /// Tags for each of the given notes, sorted by name.
    pub async fn for_notes(conn: &Connection, note_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
        let mut by_note: HashMap<i64, Vec<Tag>> = HashMap::new();
        if note_ids.is_empty() {
            return Ok(by_note);
        }

        let sql = format!(
            r#"
            SELECT nt.note_id, t.id, t.name, t.color
            FROM note_tags nt
            JOIN tags t ON t.id = nt.tag_id
            WHERE nt.note_id IN ({})
            ORDER BY t.name, t.id
            "#,
            numbered_placeholders(1, note_ids.len())
        );
        let params: Vec<libsql::Value> = note_ids.iter().map(|id| libsql::Value::from(*id)).collect();

        let mut rows = conn.query(&sql, libsql::params_from_iter(params)).await?;
        while let Some(row) = rows.next().await? {
            let note_id: i64 = row.get(0)?;
            by_note.entry(note_id).or_default().push(Tag {
                id: row.get(1)?,
                name: row.get(2)?,
                color: row.get(3)?,
            });
        }
        Ok(by_note)
    }
}
