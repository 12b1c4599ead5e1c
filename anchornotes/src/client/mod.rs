//! Client-side relevance state.
//!
//! [`RelevanceClient`] wires together everything a device needs: the
//! persisted active-geofence and relevant-note sets, per-note time windows,
//! the handler that applies platform geofence and alarm events, a background
//! expiry sweep, and the HTTP client for the server API.

mod api_client;
mod clock;
mod dispatcher;
mod events;
mod installation;
pub mod local;
mod persistence;
mod scheduler;
mod store;
mod sweeper;
mod time_range;

pub use api_client::ApiClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{Job, NotificationDispatcher};
pub use events::{GeofenceEventHandler, GeofenceTransition};
pub use installation::{installation_id, state_path};
pub use persistence::{JsonFilePersistence, MemoryPersistence, StatePersistence};
pub use scheduler::{ExpiryScheduler, Task, TokioScheduler};
pub use store::{
    Listener, ListenerId, RelevanceStore, StoreDeps, ACTIVE_GEOFENCES_KEY,
    DEFAULT_RELEVANT_TTL, RELEVANT_NOTES_KEY,
};
pub use sweeper::ExpirySweeper;
pub use time_range::{TimeRangeStore, DEFAULT_TIME_RANGE_MINUTES, MIN_TIME_RANGE_MINUTES};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::dto::NoteResponse;
use crate::config::ClientConfig;
use crate::error::Result;

pub struct RelevanceClient {
    installation_id: String,
    clock: Arc<dyn Clock>,
    dispatcher: NotificationDispatcher,
    events: GeofenceEventHandler,
    time_ranges: TimeRangeStore,
    api: ApiClient,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RelevanceClient {
    /// Opens the client state for this installation under
    /// `config.state_dir`. Must be called inside a tokio runtime.
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let installation_id = installation_id(config)?;
        let persistence = Arc::new(JsonFilePersistence::new(state_path(
            config,
            &installation_id,
        )));
        Self::with_services(
            config,
            installation_id,
            persistence,
            Arc::new(SystemClock),
            Arc::new(TokioScheduler::current()),
        )
    }

    /// Builds a client from explicit services.
    pub fn with_services(
        config: &ClientConfig,
        installation_id: String,
        persistence: Arc<dyn StatePersistence>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn ExpiryScheduler>,
    ) -> Result<Self> {
        let api = ApiClient::from_config(config)?;
        let cancel = CancellationToken::new();
        let (dispatcher, dispatcher_task) = NotificationDispatcher::spawn(cancel.child_token());

        let deps = StoreDeps {
            persistence: persistence.clone(),
            clock: clock.clone(),
            dispatcher: dispatcher.clone(),
            scheduler,
        };
        let ttl = Duration::from_secs(config.relevant_ttl_secs);
        let active_geofences = RelevanceStore::active_geofences(deps.clone());
        let relevant_notes = RelevanceStore::relevant_notes(ttl, deps);
        let time_ranges = TimeRangeStore::open(persistence);

        let sweeper = ExpirySweeper::new(relevant_notes.clone(), config.sweep_interval_secs);
        info!(
            installation_id = %installation_id,
            ttl_secs = config.relevant_ttl_secs,
            sweep_interval_secs = sweeper.interval_secs(),
            "Relevance client started"
        );
        let sweeper_task = sweeper.spawn(cancel.child_token());

        Ok(Self {
            installation_id,
            clock,
            dispatcher,
            events: GeofenceEventHandler::new(active_geofences, relevant_notes, ttl),
            time_ranges,
            api,
            cancel,
            tasks: vec![dispatcher_task, sweeper_task],
        })
    }

    pub fn installation_id(&self) -> &str {
        &self.installation_id
    }

    pub fn events(&self) -> &GeofenceEventHandler {
        &self.events
    }

    pub fn active_geofences(&self) -> &RelevanceStore {
        self.events.active_geofences()
    }

    pub fn relevant_notes(&self) -> &RelevanceStore {
        self.events.relevant_notes()
    }

    pub fn time_ranges(&self) -> &TimeRangeStore {
        &self.time_ranges
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Relevant notes from the server for the current active-geofence set.
    pub async fn fetch_relevant_notes(&self) -> Result<Vec<NoteResponse>> {
        self.api
            .relevant_notes_for(self.active_geofences(), self.clock.now())
            .await
    }

    /// Relevant notes among `cached`, computed without the server.
    pub fn local_relevant_notes<'a>(&self, cached: &'a [NoteResponse]) -> Vec<&'a NoteResponse> {
        local::relevant_notes(
            cached,
            &self.active_geofences().get_all(),
            &self.time_ranges,
            self.clock.now(),
        )
    }

    /// Waits until pending listener notifications have been delivered.
    pub async fn flush(&self) {
        self.dispatcher.flush().await;
    }

    /// Stops background tasks. Persisted state stays on disk.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        debug!("Relevance client stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    fn config_in(dir: &std::path::Path) -> ClientConfig {
        ClientConfig {
            state_dir: dir.to_string_lossy().into_owned(),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_state_persists_across_client_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let client = RelevanceClient::open(&config).unwrap();
        let id = client.installation_id().to_string();
        client
            .events()
            .on_geofence_transition(GeofenceTransition::Enter, &["note_3".to_string()]);
        client.time_ranges().set(3, 20);
        client.shutdown().await;

        let reopened = RelevanceClient::open(&config).unwrap();
        assert_eq!(reopened.installation_id(), id);
        assert!(reopened.active_geofences().contains("note_3"));
        assert!(reopened.relevant_notes().contains("3"));
        assert_eq!(reopened.time_ranges().get(3), 20);
        reopened.shutdown().await;
    }

    #[tokio::test]
    async fn test_listener_sees_event_updates() {
        let dir = tempfile::tempdir().unwrap();
        let client = RelevanceClient::open(&config_in(dir.path())).unwrap();

        let seen: Arc<Mutex<Vec<BTreeSet<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        client
            .relevant_notes()
            .add_listener(Arc::new(move |ids: &BTreeSet<String>| {
                sink.lock().unwrap().push(ids.clone())
            }));
        client.events().on_time_reminder_fired(8);
        client.flush().await;

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_empty());
        assert!(seen[1].contains("8"));

        client.shutdown().await;
    }
}
