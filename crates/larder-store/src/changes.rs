// Push-on-write change notification
//
// Listeners are held weakly. Whoever subscribes keeps the callback alive
// through the returned Subscription; dropping it unregisters the listener.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, warn};

/// Tables a write can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    FoodItems,
    WasteLogs,
    UserSettings,
}

type Callback = dyn Fn(Table) + Send + Sync;

struct Listener {
    id: u64,
    tables: Vec<Table>,
    callback: Weak<Callback>,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

impl HubInner {
    // No holder leaves the list half-updated, so a poisoned lock is safe to reuse
    fn listeners(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(|poisoned| {
            warn!("Change listener registry was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }
}

/// Registry of change listeners, keyed by the tables they care about
#[derive(Default, Clone)]
pub struct ChangeHub {
    inner: Arc<HubInner>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, tables: &[Table], callback: F) -> Subscription
    where
        F: Fn(Table) + Send + Sync + 'static,
    {
        let callback: Arc<Callback> = Arc::new(callback);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner.listeners().push(Listener {
            id,
            tables: tables.to_vec(),
            callback: Arc::downgrade(&callback),
        });

        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
            _callback: callback,
        }
    }

    /// Run every live listener interested in `table`
    ///
    /// Callbacks are collected first and invoked with the registry unlocked,
    /// so a callback may itself read from the store or subscribe.
    pub fn notify(&self, table: Table) {
        let callbacks: Vec<Arc<Callback>> = {
            let mut listeners = self.inner.listeners();
            listeners.retain(|l| l.callback.strong_count() > 0);
            listeners
                .iter()
                .filter(|l| l.tables.contains(&table))
                .filter_map(|l| l.callback.upgrade())
                .collect()
        };

        debug!("{:?} changed, notifying {} listener(s)", table, callbacks.len());
        for callback in callbacks {
            callback(table);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

/// Keeps a listener registered for as long as it lives
#[must_use = "dropping a Subscription unregisters the listener immediately"]
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
    _callback: Arc<Callback>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.listeners().retain(|l| l.id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
