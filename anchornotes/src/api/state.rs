use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::services::{GeofenceService, NoteService, RelevanceService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub relevance: RelevanceService,
    pub geofences: GeofenceService,
    pub notes: NoteService,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn DatabaseBackend>) -> Self {
        let config = Arc::new(config);
        let relevance = RelevanceService::new(db.clone(), config.relevance.window_minutes);
        let geofences = GeofenceService::new(db.clone());
        let notes = NoteService::new(db.clone());

        Self {
            config,
            db,
            relevance,
            geofences,
            notes,
        }
    }
}
