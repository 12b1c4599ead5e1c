mod geofences;
mod notes;
mod relevance;

pub use geofences::GeofenceService;
pub use notes::NoteService;
pub use relevance::RelevanceService;
