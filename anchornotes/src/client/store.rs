//! # Relevance Store
//!
//! A persisted, observable set of string ids. The client keeps two of them:
//!
//! - **active geofences**: every geofence the device is currently inside
//!   (`note_<id>` and `template_<id>`), with no expiry.
//! - **relevant notes**: note ids surfaced by a geofence entry or a fired
//!   time reminder. Entries older than the TTL are dropped by
//!   [`RelevanceStore::clear_expired`].
//!
//! Every membership change is written through to [`StatePersistence`] before
//! the mutating call returns, then announced to listeners through the
//! [`NotificationDispatcher`]. Listener callbacks always receive a snapshot
//! taken inside the same critical section as the mutation, so they observe
//! changes in order and never see a half-applied update.
//!
//! Per-entry timeouts from [`RelevanceStore::add_with_timeout`] are persisted
//! as absolute deadlines and re-armed when the store is reopened.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::clock::Clock;
use super::dispatcher::NotificationDispatcher;
use super::persistence::StatePersistence;
use super::scheduler::ExpiryScheduler;
use crate::error::AnchorError;

pub const ACTIVE_GEOFENCES_KEY: &str = "active_geofences";
pub const RELEVANT_NOTES_KEY: &str = "relevant_notes";

/// Default lifetime of a relevant-note entry.
pub const DEFAULT_RELEVANT_TTL: Duration = Duration::from_secs(60 * 60);

pub type Listener = Arc<dyn Fn(&BTreeSet<String>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    added_at_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at_ms: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Persisted {
    entries: BTreeMap<String, Entry>,
}

/// Older builds stored a bare array of ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedForm {
    Entries(Persisted),
    Ids(Vec<String>),
}

#[derive(Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

struct Inner {
    key: String,
    ttl: Option<Duration>,
    state: Mutex<State>,
    persistence: Arc<dyn StatePersistence>,
    clock: Arc<dyn Clock>,
    dispatcher: NotificationDispatcher,
    scheduler: Arc<dyn ExpiryScheduler>,
}

/// Services a store needs. Shared by every store of one client.
#[derive(Clone)]
pub struct StoreDeps {
    pub persistence: Arc<dyn StatePersistence>,
    pub clock: Arc<dyn Clock>,
    pub dispatcher: NotificationDispatcher,
    pub scheduler: Arc<dyn ExpiryScheduler>,
}

#[derive(Clone)]
pub struct RelevanceStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RelevanceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceStore")
            .field("key", &self.inner.key)
            .field("ttl", &self.inner.ttl)
            .finish()
    }
}

impl RelevanceStore {
    /// Opens the active-geofences store. Entries never age out.
    pub fn active_geofences(deps: StoreDeps) -> Self {
        Self::open(ACTIVE_GEOFENCES_KEY, None, deps)
    }

    /// Opens the relevant-notes store with the given TTL.
    pub fn relevant_notes(ttl: Duration, deps: StoreDeps) -> Self {
        Self::open(RELEVANT_NOTES_KEY, Some(ttl), deps)
    }

    /// Loads persisted entries for `key`. Unreadable state is logged and
    /// replaced with an empty set rather than failing the client.
    pub fn open(key: &str, ttl: Option<Duration>, deps: StoreDeps) -> Self {
        let now_ms = deps.clock.now_ms();
        let mut entries = load_entries(key, deps.persistence.as_ref(), now_ms);

        let before = entries.len();
        entries.retain(|_, entry| !is_expired(entry, ttl, now_ms));
        let dropped = before - entries.len();

        let inner = Arc::new(Inner {
            key: key.to_string(),
            ttl,
            state: Mutex::new(State {
                entries,
                ..State::default()
            }),
            persistence: deps.persistence,
            clock: deps.clock,
            dispatcher: deps.dispatcher,
            scheduler: deps.scheduler,
        });
        let store = Self { inner };

        {
            let state = store.lock();
            if dropped > 0 {
                store.persist(&state);
            }
            for (id, entry) in &state.entries {
                if let Some(deadline) = entry.expires_at_ms {
                    store.arm(id.clone(), deadline, now_ms);
                }
            }
            debug!(
                store = %store.inner.key,
                entries = state.entries.len(),
                dropped,
                "Relevance store opened"
            );
        }

        store
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.inner.ttl
    }

    /// Adds `id`. No-op if already present, in which case the original
    /// added-at time is kept.
    pub fn add(&self, id: &str) {
        if id.is_empty() {
            warn!(store = %self.inner.key, "Ignoring empty id");
            return;
        }
        let mut state = self.lock();
        if state.entries.contains_key(id) {
            return;
        }
        state.entries.insert(
            id.to_string(),
            Entry {
                added_at_ms: self.inner.clock.now_ms(),
                expires_at_ms: None,
            },
        );
        self.commit(&state);
    }

    /// Adds `id` and removes it again after `timeout`.
    ///
    /// When called for an id that is already present, the earliest pending
    /// deadline wins. A later plain [`add`](Self::add) after the entry was
    /// removed is not affected by a stale deadline.
    pub fn add_with_timeout(&self, id: &str, timeout: Duration) {
        if id.is_empty() {
            warn!(store = %self.inner.key, "Ignoring empty id");
            return;
        }
        let now_ms = self.inner.clock.now_ms();
        let deadline = now_ms.saturating_add(duration_ms(timeout));

        let mut state = self.lock();
        let changed_membership = match state.entries.get_mut(id) {
            Some(entry) => {
                let earliest = entry.expires_at_ms.map_or(deadline, |d| d.min(deadline));
                entry.expires_at_ms = Some(earliest);
                false
            }
            None => {
                state.entries.insert(
                    id.to_string(),
                    Entry {
                        added_at_ms: now_ms,
                        expires_at_ms: Some(deadline),
                    },
                );
                true
            }
        };

        if changed_membership {
            self.commit(&state);
        } else {
            self.persist(&state);
        }
        self.arm(id.to_string(), deadline, now_ms);
    }

    /// Removes `id`. Returns whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        if id.is_empty() {
            warn!(store = %self.inner.key, "Ignoring empty id");
            return false;
        }
        let mut state = self.lock();
        if state.entries.remove(id).is_none() {
            return false;
        }
        self.commit(&state);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// Snapshot of the current ids. Later mutations do not affect it.
    pub fn get_all(&self) -> BTreeSet<String> {
        self.lock().entries.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn clear_all(&self) {
        let mut state = self.lock();
        if state.entries.is_empty() {
            return;
        }
        state.entries.clear();
        self.commit(&state);
    }

    /// Drops entries older than the TTL and entries whose deadline has
    /// passed. Returns how many were removed. Listeners are notified once.
    pub fn clear_expired(&self) -> usize {
        let now_ms = self.inner.clock.now_ms();
        let ttl = self.inner.ttl;

        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !is_expired(entry, ttl, now_ms));
        let removed = before - state.entries.len();

        if removed > 0 {
            debug!(store = %self.inner.key, removed, "Cleared expired entries");
            self.commit(&state);
        }
        removed
    }

    /// Registers `listener` and schedules one call with the current snapshot.
    pub fn add_listener(&self, listener: Listener) -> ListenerId {
        let mut state = self.lock();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.push((id, listener.clone()));

        let snapshot: BTreeSet<String> = state.entries.keys().cloned().collect();
        self.inner
            .dispatcher
            .post(Box::new(move || listener(&snapshot)));
        id
    }

    /// Returns whether a listener was registered under `id`.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(lid, _)| *lid != id);
        state.listeners.len() != before
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persists and notifies. Called with the lock held.
    fn commit(&self, state: &State) {
        self.persist(state);

        if state.listeners.is_empty() {
            return;
        }
        let snapshot: BTreeSet<String> = state.entries.keys().cloned().collect();
        let listeners: Vec<Listener> = state.listeners.iter().map(|(_, l)| l.clone()).collect();
        // posted under the lock so deliveries keep mutation order
        self.inner.dispatcher.post(Box::new(move || {
            for listener in &listeners {
                listener(&snapshot);
            }
        }));
    }

    fn persist(&self, state: &State) {
        let doc = Persisted {
            entries: state.entries.clone(),
        };
        let result = serde_json::to_string(&doc)
            .map_err(AnchorError::from)
            .and_then(|json| self.inner.persistence.save(&self.inner.key, &json));
        if let Err(e) = result {
            warn!(store = %self.inner.key, error = %e, "Failed to persist relevance store");
        }
    }

    fn arm(&self, id: String, deadline_ms: i64, now_ms: i64) {
        let delay = Duration::from_millis(u64::try_from(deadline_ms - now_ms).unwrap_or(0));
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    RelevanceStore { inner }.expire(&id, deadline_ms);
                }
            }),
        );
    }

    /// Removes `id` if its recorded deadline is due by `deadline_ms`.
    fn expire(&self, id: &str, deadline_ms: i64) {
        let mut state = self.lock();
        let due = matches!(
            state.entries.get(id),
            Some(Entry { expires_at_ms: Some(d), .. }) if *d <= deadline_ms
        );
        if !due {
            return;
        }
        state.entries.remove(id);
        debug!(store = %self.inner.key, id, "Entry timed out");
        self.commit(&state);
    }
}

fn load_entries(
    key: &str,
    persistence: &dyn StatePersistence,
    now_ms: i64,
) -> BTreeMap<String, Entry> {
    let raw = match persistence.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return BTreeMap::new(),
        Err(e) => {
            warn!(store = key, error = %e, "Failed to load relevance store, starting empty");
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<PersistedForm>(&raw) {
        Ok(PersistedForm::Entries(doc)) => doc.entries,
        Ok(PersistedForm::Ids(ids)) => ids
            .into_iter()
            .filter(|id| !id.is_empty())
            .map(|id| {
                (
                    id,
                    Entry {
                        added_at_ms: now_ms,
                        expires_at_ms: None,
                    },
                )
            })
            .collect(),
        Err(e) => {
            warn!(store = key, error = %e, "Corrupt relevance store, starting empty");
            BTreeMap::new()
        }
    }
}

fn is_expired(entry: &Entry, ttl: Option<Duration>, now_ms: i64) -> bool {
    if entry.expires_at_ms.is_some_and(|d| d <= now_ms) {
        return true;
    }
    ttl.is_some_and(|ttl| now_ms - entry.added_at_ms > duration_ms(ttl))
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
