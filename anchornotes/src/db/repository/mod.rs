mod attachments;
mod geofences;
mod notes;
mod tags;

pub use attachments::AttachmentRepository;
pub use geofences::GeofenceRepository;
pub use notes::NoteRepository;
pub use tags::TagRepository;

use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width UTC timestamps so that TEXT comparison (`BETWEEN`, `ORDER BY`)
/// agrees with chronological order.
pub(crate) fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn from_db_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn numbered_placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}
