use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        -- Geofences attached to notes. One row per "set geofence reminder" call.
        CREATE TABLE IF NOT EXISTS geofences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            radius INTEGER NOT NULL CHECK (radius > 0),
            address_name TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_geofences_user ON geofences(user_id);

        -- Media references. Upload and storage happen elsewhere.
        CREATE TABLE IF NOT EXISTS attachments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            media_url TEXT NOT NULL,
            media_type TEXT,
            duration_sec INTEGER,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            text TEXT NOT NULL DEFAULT '',
            pinned INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_edited TEXT NOT NULL,
            reminder_time TEXT,
            geofence_id INTEGER REFERENCES geofences(id) ON DELETE SET NULL,
            image_id INTEGER REFERENCES attachments(id) ON DELETE SET NULL,
            audio_id INTEGER REFERENCES attachments(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notes_user_reminder ON notes(user_id, reminder_time);
        CREATE INDEX IF NOT EXISTS idx_notes_user_last_edited ON notes(user_id, last_edited);
        CREATE INDEX IF NOT EXISTS idx_notes_geofence ON notes(geofence_id);

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            color TEXT,
            UNIQUE (user_id, name)
        );

        CREATE TABLE IF NOT EXISTS note_tags (
            note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (note_id, tag_id)
        );

        CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag_id);
        "#,
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        init_schema(&conn).await.unwrap();
        init_schema(&conn).await.unwrap();

        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                (),
            )
            .await
            .unwrap();

        let mut tables = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            tables.push(row.get::<String>(0).unwrap());
        }
        assert_eq!(
            tables,
            vec!["attachments", "geofences", "note_tags", "notes", "tags"]
        );
    }

    #[tokio::test]
    async fn test_geofence_radius_must_be_positive() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();
        init_schema(&conn).await.unwrap();

        let result = conn
            .execute(
                "INSERT INTO geofences (user_id, latitude, longitude, radius, created_at) VALUES ('u', 0, 0, 0, 'now')",
                (),
            )
            .await;
        assert!(result.is_err());
    }
}
