use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{note_geofence_id, GeofenceRegistration, NewGeofence};

use super::to_db_timestamp;

pub struct GeofenceRepository;

impl GeofenceRepository {
    pub async fn create(
        conn: &Connection,
        user_id: &str,
        geofence: &NewGeofence,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO geofences (user_id, latitude, longitude, radius, address_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                user_id,
                geofence.latitude,
                geofence.longitude,
                geofence.radius_meters,
                geofence.address_name.clone(),
                to_db_timestamp(&now),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    /// Drop a geofence row once no note points at it anymore.
    pub async fn delete_if_orphaned(conn: &Connection, geofence_id: i64) -> Result<bool> {
        let affected = conn
            .execute(
                r#"
                DELETE FROM geofences
                WHERE id = ?1
                  AND NOT EXISTS (SELECT 1 FROM notes WHERE geofence_id = ?1)
                "#,
                params![geofence_id],
            )
            .await?;
        Ok(affected > 0)
    }

    /// Every geofence attached to one of the user's notes, keyed by the
    /// derived `note_<id>` geofence id.
    pub async fn list_for_registration(
        conn: &Connection,
        user_id: &str,
    ) -> Result<Vec<GeofenceRegistration>> {
        let mut rows = conn
            .query(
                r#"
                SELECT n.id, g.latitude, g.longitude, g.radius
                FROM notes n
                JOIN geofences g ON g.id = n.geofence_id
                WHERE n.user_id = ?1
                ORDER BY n.id
                "#,
                params![user_id],
            )
            .await?;

        let mut registrations = Vec::new();
        while let Some(row) = rows.next().await? {
            registrations.push(GeofenceRegistration {
                geofence_id: note_geofence_id(row.get(0)?),
                latitude: row.get(1)?,
                longitude: row.get(2)?,
                radius_meters: row.get(3)?,
            });
        }
        Ok(registrations)
    }
}
