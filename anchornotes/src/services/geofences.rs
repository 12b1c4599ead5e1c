use std::sync::Arc;

use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::models::GeofenceRegistration;

/// Feed of every geofence the server knows for a user, so a device can
/// rebuild its OS-level monitors after reinstall or reboot.
#[derive(Clone)]
pub struct GeofenceService {
    db: Arc<dyn DatabaseBackend>,
}

impl GeofenceService {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }

    pub async fn registrations(&self, user_id: &str) -> Result<Vec<GeofenceRegistration>> {
        self.db.list_geofence_registrations(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::test_backend;
    use crate::models::{note_geofence_id, NewGeofence, NewNote};
    use chrono::Utc;

    #[tokio::test]
    async fn test_feed_lists_every_geofenced_note() {
        // Given: three geofenced notes and one plain note
        let (db, _dir) = test_backend().await;
        let now = Utc::now();
        let mut fenced = Vec::new();
        for radius in [50, 100, 150] {
            let note = NewNote {
                title: format!("r{radius}"),
                geofence: Some(NewGeofence {
                    latitude: 1.0,
                    longitude: 2.0,
                    radius_meters: radius,
                    address_name: None,
                }),
                ..Default::default()
            };
            fenced.push(db.create_note("alice", &note, now).await.unwrap());
        }
        db.create_note("alice", &NewNote::default(), now).await.unwrap();
        let service = GeofenceService::new(db);

        // When
        let feed = service.registrations("alice").await.unwrap();

        // Then
        assert_eq!(feed.len(), 3);
        for (entry, (id, radius)) in feed.iter().zip(fenced.iter().zip([50, 100, 150])) {
            assert_eq!(entry.geofence_id, note_geofence_id(*id));
            assert_eq!(entry.radius_meters, radius);
        }
    }

    #[tokio::test]
    async fn test_feed_is_scoped_to_user() {
        let (db, _dir) = test_backend().await;
        let note = NewNote {
            geofence: Some(NewGeofence {
                latitude: 1.0,
                longitude: 2.0,
                radius_meters: 10,
                address_name: None,
            }),
            ..Default::default()
        };
        db.create_note("bob", &note, Utc::now()).await.unwrap();

        let feed = GeofenceService::new(db).registrations("alice").await.unwrap();
        assert!(feed.is_empty());
    }
}
