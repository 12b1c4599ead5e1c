use serde::{Deserialize, Serialize};
use validator::Validate;

/// Prefix of the device-level geofence id registered for a note.
pub const NOTE_GEOFENCE_PREFIX: &str = "note_";
/// Prefix of the device-level geofence id registered for a template.
pub const TEMPLATE_GEOFENCE_PREFIX: &str = "template_";

/// The geofence id a device registers for a note. Derived, never stored.
pub fn note_geofence_id(note_id: i64) -> String {
    format!("{NOTE_GEOFENCE_PREFIX}{note_id}")
}

/// Extract the note id from a `note_<id>` geofence id.
///
/// Anything else (template geofences, garbage, ids that overflow) yields
/// `None`.
pub fn parse_note_geofence_id(geofence_id: &str) -> Option<i64> {
    match GeofenceOwner::parse(geofence_id)? {
        GeofenceOwner::Note(id) => Some(id),
        GeofenceOwner::Template(_) => None,
    }
}

/// What a device-level geofence id points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeofenceOwner {
    Note(i64),
    Template(i64),
}

impl GeofenceOwner {
    pub fn parse(geofence_id: &str) -> Option<Self> {
        let id = geofence_id.trim();
        if let Some(rest) = id.strip_prefix(NOTE_GEOFENCE_PREFIX) {
            return parse_positive(rest).map(Self::Note);
        }
        if let Some(rest) = id.strip_prefix(TEMPLATE_GEOFENCE_PREFIX) {
            return parse_positive(rest).map(Self::Template);
        }
        None
    }

    pub fn geofence_id(&self) -> String {
        match self {
            Self::Note(id) => note_geofence_id(*id),
            Self::Template(id) => format!("{TEMPLATE_GEOFENCE_PREFIX}{id}"),
        }
    }
}

fn parse_positive(digits: &str) -> Option<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|id| *id > 0)
}

/// A stored geofence row. Owned by exactly one user and referenced from the
/// note side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub id: i64,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: i64,
    pub address_name: Option<String>,
}

/// Geofence parameters supplied when attaching a location reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewGeofence {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 1))]
    pub radius_meters: i64,
    #[validate(length(max = 255))]
    pub address_name: Option<String>,
}

/// Everything a device needs to (re-)register one OS-level monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRegistration {
    pub geofence_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: i64,
}
