//! Offline relevance over notes the client already has cached.
//!
//! Mirrors the server's union of time and geofence relevance, but uses the
//! per-note windows from [`TimeRangeStore`] and the device's own
//! active-geofence set.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use super::time_range::TimeRangeStore;
use crate::api::dto::NoteResponse;

pub fn is_time_relevant(note: &NoteResponse, ranges: &TimeRangeStore, now: DateTime<Utc>) -> bool {
    let Some(reminder) = note.reminder_time_utc else {
        return false;
    };
    let window = Duration::minutes(i64::from(ranges.get(note.id)));
    reminder >= now - window && reminder <= now + window
}

pub fn is_geofence_relevant(note: &NoteResponse, active_geofences: &BTreeSet<String>) -> bool {
    note.geofence
        .as_ref()
        .is_some_and(|g| active_geofences.contains(&g.id))
}

/// Notes that are time- or geofence-relevant, most recently edited first.
pub fn relevant_notes<'a>(
    notes: &'a [NoteResponse],
    active_geofences: &BTreeSet<String>,
    ranges: &TimeRangeStore,
    now: DateTime<Utc>,
) -> Vec<&'a NoteResponse> {
    let mut relevant: Vec<&NoteResponse> = notes
        .iter()
        .filter(|n| is_time_relevant(n, ranges, now) || is_geofence_relevant(n, active_geofences))
        .collect();
    relevant.sort_by(|a, b| {
        b.last_edited
            .cmp(&a.last_edited)
            .then_with(|| b.id.cmp(&a.id))
    });
    relevant.dedup_by_key(|n| n.id);
    relevant
}
