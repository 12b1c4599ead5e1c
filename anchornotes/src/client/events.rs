//! Applies OS-level reminder events to the relevance stores.
//!
//! The platform geofencing service reports transitions for the device-level
//! ids built by [`crate::models::GeofenceOwner::geofence_id`]. A transition
//! on a note geofence moves both stores; a template geofence only tracks
//! presence.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::store::RelevanceStore;
use crate::models::GeofenceOwner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceTransition {
    Enter,
    Exit,
}

#[derive(Debug, Clone)]
pub struct GeofenceEventHandler {
    active_geofences: RelevanceStore,
    relevant_notes: RelevanceStore,
    reminder_ttl: Duration,
}

impl GeofenceEventHandler {
    pub fn new(
        active_geofences: RelevanceStore,
        relevant_notes: RelevanceStore,
        reminder_ttl: Duration,
    ) -> Self {
        Self {
            active_geofences,
            relevant_notes,
            reminder_ttl,
        }
    }

    /// Handles one batched transition. The platform may report several
    /// geofences in a single event.
    pub fn on_geofence_transition(&self, transition: GeofenceTransition, geofence_ids: &[String]) {
        for geofence_id in geofence_ids {
            if geofence_id.is_empty() {
                warn!("Geofence event with empty id");
                continue;
            }
            let owner = GeofenceOwner::parse(geofence_id);
            match transition {
                GeofenceTransition::Enter => {
                    self.active_geofences.add(geofence_id);
                    if let Some(GeofenceOwner::Note(note_id)) = owner {
                        self.relevant_notes.add(&note_id.to_string());
                    }
                }
                GeofenceTransition::Exit => {
                    self.active_geofences.remove(geofence_id);
                    if let Some(GeofenceOwner::Note(note_id)) = owner {
                        self.relevant_notes.remove(&note_id.to_string());
                    }
                }
            }
            if owner.is_none() {
                debug!(geofence_id, "Geofence id has no known owner");
            }
        }
        info!(
            ?transition,
            count = geofence_ids.len(),
            active = self.active_geofences.count(),
            "Geofence transition applied"
        );
    }

    /// A time reminder fired: the note stays relevant for the reminder TTL.
    pub fn on_time_reminder_fired(&self, note_id: i64) {
        if note_id <= 0 {
            warn!(note_id, "Time reminder for invalid note id");
            return;
        }
        self.relevant_notes
            .add_with_timeout(&note_id.to_string(), self.reminder_ttl);
        info!(note_id, "Time reminder fired");
    }

    pub fn active_geofences(&self) -> &RelevanceStore {
        &self.active_geofences
    }

    pub fn relevant_notes(&self) -> &RelevanceStore {
        &self.relevant_notes
    }
}
