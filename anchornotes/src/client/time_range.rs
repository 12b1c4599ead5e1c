//! Per-note relevance window for time reminders.
//!
//! A note with a time reminder counts as relevant while the reminder is
//! within ± its window of "now". The window defaults to 60 minutes and can be
//! tuned per note from the client UI.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use super::persistence::StatePersistence;
use crate::error::AnchorError;

pub const TIME_RANGES_KEY: &str = "time_ranges";
pub const DEFAULT_TIME_RANGE_MINUTES: u32 = 60;
pub const MIN_TIME_RANGE_MINUTES: u32 = 1;

#[derive(Clone)]
pub struct TimeRangeStore {
    ranges: Arc<Mutex<BTreeMap<i64, u32>>>,
    persistence: Arc<dyn StatePersistence>,
}

impl std::fmt::Debug for TimeRangeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeRangeStore")
            .field("ranges", &*self.lock())
            .finish()
    }
}

impl TimeRangeStore {
    pub fn open(persistence: Arc<dyn StatePersistence>) -> Self {
        let ranges = match persistence.load(TIME_RANGES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Corrupt time range state, using defaults");
                BTreeMap::new()
            }),
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, "Failed to load time ranges, using defaults");
                BTreeMap::new()
            }
        };
        Self {
            ranges: Arc::new(Mutex::new(ranges)),
            persistence,
        }
    }

    /// Window in minutes for `note_id`.
    pub fn get(&self, note_id: i64) -> u32 {
        self.lock()
            .get(&note_id)
            .copied()
            .unwrap_or(DEFAULT_TIME_RANGE_MINUTES)
    }

    /// Sets the window, clamped to at least one minute. Returns the stored value.
    pub fn set(&self, note_id: i64, minutes: u32) -> u32 {
        let minutes = minutes.max(MIN_TIME_RANGE_MINUTES);
        let mut ranges = self.lock();
        ranges.insert(note_id, minutes);
        self.persist(&ranges);
        minutes
    }

    /// Reverts `note_id` to the default window.
    pub fn clear(&self, note_id: i64) {
        let mut ranges = self.lock();
        if ranges.remove(&note_id).is_some() {
            self.persist(&ranges);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<i64, u32>> {
        self.ranges.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, ranges: &BTreeMap<i64, u32>) {
        let result = serde_json::to_string(ranges)
            .map_err(AnchorError::from)
            .and_then(|json| self.persistence.save(TIME_RANGES_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist time ranges");
        }
    }
}
