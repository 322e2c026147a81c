use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::sync::watch;

static SHARED_TRACKER: OnceLock<PendingFetchTracker> = OnceLock::new();

/// Tracks which encoded keys are awaiting a fetch response and publishes a
/// single boolean ("at least one fetch is outstanding") for loading
/// indicators, without exposing the keys themselves.
///
/// The signal is a [`watch`] channel that emits only on `Idle ↔ Busy`
/// transitions: adding a second key while already busy, or removing one of
/// several, changes nothing observers care about and produces no wakeup.
#[derive(Clone)]
pub struct PendingFetchTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    keys: Mutex<HashSet<String>>,
    busy: watch::Sender<bool>,
}

impl Default for PendingFetchTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingFetchTracker {
    pub fn new() -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            inner: Arc::new(TrackerInner {
                keys: Mutex::new(HashSet::new()),
                busy,
            }),
        }
    }

    /// The process-wide instance used when no tracker is injected.
    pub fn shared() -> Self {
        SHARED_TRACKER.get_or_init(Self::new).clone()
    }

    /// Marks a key as awaiting its fetch. Set semantics: re-adding a pending
    /// key is a no-op. Returns whether the key was newly inserted, which is
    /// the orchestrator's atomic check-and-mark for dispatch deduplication;
    /// a `false` here means some run already has this fetch in flight.
    pub fn add_task(&self, key: &str) -> bool {
        let mut keys = self.lock_keys();
        let inserted = keys.insert(key.to_owned());
        self.publish(!keys.is_empty());
        inserted
    }

    /// Clears a key once its fetch has settled. No-op for absent keys.
    pub fn remove_task(&self, key: &str) {
        let mut keys = self.lock_keys();
        keys.remove(key);
        self.publish(!keys.is_empty());
    }

    /// Current value of the busy signal.
    pub fn has_pending_jobs(&self) -> bool {
        *self.inner.busy.borrow()
    }

    pub fn pending_count(&self) -> usize {
        self.lock_keys().len()
    }

    /// Subscribes to the busy signal. The receiver sees the value at
    /// subscription time and is woken on every transition thereafter.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.busy.subscribe()
    }

    // Signal updates happen under the set lock so emission order always
    // matches transition order.
    fn publish(&self, busy: bool) {
        self.inner.busy.send_if_modified(|state| {
            if *state != busy {
                *state = busy;
                true
            } else {
                false
            }
        });
    }

    fn lock_keys(&self) -> MutexGuard<'_, HashSet<String>> {
        self.inner.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
