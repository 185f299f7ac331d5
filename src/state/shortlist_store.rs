//! Shared, observable shortlist store
//!
//! One store instance is constructed by the host and handed to every surface
//! that needs it. Mutations are synchronous: the set is updated, persisted,
//! and then every live listener is called in registration order with the new
//! state before the mutating call returns.
//!
//! Each mutation gets a revision number under the state lock. Notification
//! passes from different threads run one at a time, and a listener is never
//! handed a revision older than one it has already seen, so the last state a
//! listener observes is the committed one.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak,
    },
    thread::{self, ThreadId},
};

use tracing::{debug, info};

use super::ShortlistState;
use crate::{
    error::CoreError,
    services::{PersistedShortlist, ShortlistPersistence, UnitCatalog},
    utils::{encode_share_link, Diagnostics},
};

/// Share-link base used when the caller does not supply one
pub const DEFAULT_SHARE_BASE_URL: &str = "https://presale.example/shortlist";

type Listener = dyn Fn(&ShortlistState) + Send + Sync;

struct ListenerEntry {
    id: u64,
    active: AtomicBool,
    /// Newest revision handed to this listener
    delivered: AtomicU64,
    callback: Box<Listener>,
}

impl ListenerEntry {
    /// Claim `revision` for delivery. False once a newer one went out.
    fn claim(&self, revision: u64) -> bool {
        self.active.load(Ordering::SeqCst)
            && self.delivered.fetch_max(revision, Ordering::SeqCst) < revision
    }
}

#[derive(Default)]
struct ListenerRegistry {
    entries: Vec<Arc<ListenerEntry>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.entries.len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializes notification passes across threads.
///
/// Re-entrant on the owning thread, so a listener may mutate the store from
/// inside its own notification.
#[derive(Debug, Default)]
struct DeliveryGate {
    owner: Mutex<Option<(ThreadId, usize)>>,
    released: Condvar,
}

impl DeliveryGate {
    fn enter(&self) -> DeliveryGuard<'_> {
        let me = thread::current().id();
        let mut owner = self
            .released
            .wait_while(lock(&self.owner), |owner| {
                matches!(owner, Some((id, _)) if *id != me)
            })
            .unwrap_or_else(PoisonError::into_inner);
        let depth = owner.map_or(0, |(_, depth)| depth);
        *owner = Some((me, depth + 1));
        DeliveryGuard { gate: self }
    }
}

struct DeliveryGuard<'a> {
    gate: &'a DeliveryGate,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        let mut owner = lock(&self.gate.owner);
        *owner = match *owner {
            Some((id, depth)) if depth > 1 => Some((id, depth - 1)),
            _ => None,
        };
        if owner.is_none() {
            self.gate.released.notify_all();
        }
    }
}

/// Handle returned by [`ShortlistStore::subscribe`].
///
/// Dropping it unsubscribes. Use [`Subscription::detach`] for listeners that
/// should live as long as the store.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    entry: Arc<ListenerEntry>,
    registry: Option<Weak<Mutex<ListenerRegistry>>>,
}

impl Subscription {
    /// Stop receiving notifications. Safe to call at any time, including from
    /// inside a notification, and more than once.
    pub fn unsubscribe(&self) {
        self.entry.active.store(false, Ordering::SeqCst);
        if let Some(registry) = self.registry.as_ref().and_then(Weak::upgrade) {
            lock(&registry)
                .entries
                .retain(|entry| entry.id != self.entry.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.entry.active.load(Ordering::SeqCst)
    }

    /// Keep the listener registered for the lifetime of the store
    pub fn detach(mut self) {
        self.registry = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.is_some() {
            self.unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.entry.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// The shortlist every surface shares
pub struct ShortlistStore {
    state: Mutex<ShortlistState>,
    listeners: Arc<Mutex<ListenerRegistry>>,
    next_listener_id: AtomicU64,
    revision: AtomicU64,
    delivery: DeliveryGate,
    persistence: Option<Arc<dyn ShortlistPersistence>>,
    catalog: Option<Arc<dyn UnitCatalog>>,
    degraded: AtomicBool,
    diagnostics: Diagnostics,
}

impl ShortlistStore {
    /// Create the store and load any persisted shortlist.
    ///
    /// Without persistence the store is memory-only from the start. If the
    /// backend is unavailable the store degrades to memory-only for the rest
    /// of its life and reports the failure to `diagnostics`.
    pub fn init(
        persistence: Option<Arc<dyn ShortlistPersistence>>,
        catalog: Option<Arc<dyn UnitCatalog>>,
        diagnostics: Diagnostics,
    ) -> Self {
        let store = Self {
            state: Mutex::new(ShortlistState::new()),
            listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
            next_listener_id: AtomicU64::new(0),
            revision: AtomicU64::new(0),
            delivery: DeliveryGate::default(),
            persistence,
            catalog,
            degraded: AtomicBool::new(false),
            diagnostics,
        };
        store.restore();
        store
    }

    /// Memory-only store with no catalog
    pub fn in_memory() -> Self {
        Self::init(None, None, Diagnostics::new())
    }

    fn restore(&self) {
        let Some(persistence) = &self.persistence else {
            debug!("Shortlist store running without persistence");
            return;
        };

        match persistence.load() {
            Ok(persisted) => {
                let mut state = lock(&self.state);
                for id in &persisted.unit_ids {
                    state.insert(id, self.catalog.as_deref());
                }
                info!("Restored {} shortlisted units", state.len());
            }
            Err(e @ CoreError::Json(_)) => {
                // Unreadable payload: start empty, the next save overwrites it
                self.diagnostics.report(e);
            }
            Err(e) => {
                self.degraded.store(true, Ordering::SeqCst);
                self.diagnostics.report(e);
            }
        }
    }

    /// Add a unit. Returns whether the shortlist changed; observers are only
    /// notified when it did.
    pub fn add_unit(&self, unit_id: &str) -> bool {
        self.mutate("add", false, |state, catalog| state.insert(unit_id, catalog))
    }

    /// Remove a unit. Returns whether the shortlist changed; observers are
    /// only notified when it did.
    pub fn remove_unit(&self, unit_id: &str) -> bool {
        self.mutate("remove", false, |state, _| state.remove(unit_id))
    }

    /// Remove the unit if present, add it otherwise, as one mutation.
    /// Returns whether the unit is shortlisted afterwards.
    pub fn toggle_unit(&self, unit_id: &str) -> bool {
        let mut now_present = false;
        self.mutate("toggle", false, |state, catalog| {
            if state.remove(unit_id) {
                return true;
            }
            now_present = state.insert(unit_id, catalog);
            now_present
        });
        now_present
    }

    /// Empty the shortlist. Always notifies, even when already empty.
    pub fn clear(&self) {
        self.mutate("clear", true, |state, _| {
            state.clear();
            true
        });
    }

    /// Register a listener called with the full state after every mutation
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ShortlistState) + Send + Sync + 'static,
    {
        let entry = Arc::new(ListenerEntry {
            id: self.next_listener_id.fetch_add(1, Ordering::SeqCst),
            active: AtomicBool::new(true),
            delivered: AtomicU64::new(0),
            callback: Box::new(listener),
        });
        lock(&self.listeners).entries.push(Arc::clone(&entry));
        debug!("Shortlist listener {} subscribed", entry.id);

        Subscription {
            entry,
            registry: Some(Arc::downgrade(&self.listeners)),
        }
    }

    /// Canonical share link for the current shortlist
    pub fn generate_share_link(&self, base_url: Option<&str>) -> String {
        let state = lock(&self.state);
        encode_share_link(base_url.unwrap_or(DEFAULT_SHARE_BASE_URL), &state.unit_ids)
    }

    /// Snapshot of the current shortlist
    pub fn get_shortlist(&self) -> ShortlistState {
        lock(&self.state).clone()
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        lock(&self.state).contains(unit_id)
    }

    pub fn len(&self) -> usize {
        lock(&self.state).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).is_empty()
    }

    /// Whether persistence has been given up on for this session
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }

    fn mutate<F>(&self, action: &'static str, always_notify: bool, apply: F) -> bool
    where
        F: FnOnce(&mut ShortlistState, Option<&dyn UnitCatalog>) -> bool,
    {
        let mut state = lock(&self.state);
        let changed = apply(&mut state, self.catalog.as_deref());
        if !changed && !always_notify {
            debug!("Shortlist {} left the set unchanged", action);
            return false;
        }

        let snapshot = state.clone();
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        // Saved under the state lock so saves land in mutation order
        self.persist(&snapshot);
        drop(state);

        debug!("Shortlist {} (revision {}): {} units", action, revision, snapshot.len());
        self.notify(&snapshot, revision);
        changed
    }

    fn persist(&self, state: &ShortlistState) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        if self.is_degraded() {
            return;
        }

        let persisted = PersistedShortlist {
            unit_ids: state.unit_ids.clone(),
        };
        if let Err(e) = persistence.save(&persisted) {
            self.degraded.store(true, Ordering::SeqCst);
            self.diagnostics.report(e);
        }
    }

    fn notify(&self, snapshot: &ShortlistState, revision: u64) {
        let _pass = self.delivery.enter();
        // Iterate a copy so listeners may (un)subscribe mid-pass
        let entries = lock(&self.listeners).entries.clone();
        for entry in entries {
            if entry.claim(revision) {
                (entry.callback)(snapshot);
            } else {
                debug!("Skipping stale revision {} for listener {}", revision, entry.id);
            }
        }
    }
}

impl fmt::Debug for ShortlistStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortlistStore")
            .field("state", &*lock(&self.state))
            .field("listeners", &*lock(&self.listeners))
            .field("persistent", &self.persistence.is_some())
            .field("degraded", &self.is_degraded())
            .finish()
    }
}
