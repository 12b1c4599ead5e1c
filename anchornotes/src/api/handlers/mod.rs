pub mod geofences;
pub(crate) mod health;
pub mod notes;
pub mod relevance;

pub use health::health_check;
