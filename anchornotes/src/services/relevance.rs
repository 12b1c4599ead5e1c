use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::MAX_RELEVANCE_WINDOW_MINUTES;
use crate::db::DatabaseBackend;
use crate::error::{AnchorError, Result};
use crate::models::{is_storable_timestamp, parse_note_geofence_id, Note};

/// Computes which of a user's notes are relevant right now.
///
/// A note is relevant when its reminder time lies within `window` of `now`
/// (inclusive on both ends), or when the client reports being inside the
/// note's geofence. Nothing is cached; every call reads the store.
#[derive(Clone)]
pub struct RelevanceService {
    db: Arc<dyn DatabaseBackend>,
    window: Duration,
}

impl RelevanceService {
    pub fn new(db: Arc<dyn DatabaseBackend>, window_minutes: i64) -> Self {
        Self {
            db,
            window: Duration::minutes(window_minutes.clamp(0, MAX_RELEVANCE_WINDOW_MINUTES)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Union of time-relevant and geofence-relevant notes, each note once,
    /// most recently edited first.
    ///
    /// Geofence ids that are malformed, belong to templates, or name notes of
    /// other users are ignored rather than rejected.
    pub async fn relevant_notes(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        inside_geofence_ids: &[String],
    ) -> Result<Vec<Note>> {
        let (start, end) = match (
            now.checked_sub_signed(self.window),
            now.checked_add_signed(self.window),
        ) {
            (Some(start), Some(end))
                if is_storable_timestamp(&start) && is_storable_timestamp(&end) =>
            {
                (start, end)
            }
            _ => return Err(AnchorError::Validation("nowUtc out of range".to_string())),
        };
        let time_relevant = self
            .db
            .find_time_relevant_notes(user_id, start, end)
            .await?;

        let note_ids: Vec<i64> = inside_geofence_ids
            .iter()
            .filter_map(|id| parse_note_geofence_id(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let geofence_relevant = self.db.find_geofenced_notes(user_id, &note_ids).await?;

        debug!(
            user_id,
            time_relevant = time_relevant.len(),
            geofence_relevant = geofence_relevant.len(),
            ignored_ids = inside_geofence_ids.len() - note_ids.len(),
            "Computed relevance"
        );

        Ok(merge_by_recency(time_relevant, geofence_relevant))
    }
}

fn merge_by_recency(first: Vec<Note>, second: Vec<Note>) -> Vec<Note> {
    let mut by_id: HashMap<i64, Note> = HashMap::with_capacity(first.len() + second.len());
    for note in first.into_iter().chain(second) {
        by_id.entry(note.id).or_insert(note);
    }

    let mut notes: Vec<Note> = by_id.into_values().collect();
    notes.sort_by(|a, b| {
        b.last_edited
            .cmp(&a.last_edited)
            .then_with(|| b.id.cmp(&a.id))
    });
    notes
}
