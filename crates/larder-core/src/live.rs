// Live queries: a query result that re-runs itself after relevant writes
use larder_store::{Store, Subscription, Table};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

/// Latest result of a query, refreshed whenever one of its tables changes
///
/// The refresh happens synchronously on the writer's thread right after the
/// write commits. Dropping the LiveQuery releases the store subscription.
pub struct LiveQuery<T> {
    rx: watch::Receiver<T>,
    _subscription: Subscription,
}

impl<T> LiveQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new<F>(store: &Arc<Store>, tables: &[Table], query: F) -> crate::Result<Self>
    where
        F: Fn(&Store) -> larder_store::Result<T> + Send + Sync + 'static,
    {
        let initial = query(store)?;
        let (tx, rx) = watch::channel(initial);

        let store_ref = Arc::downgrade(store);
        let subscription = store.subscribe(tables, move |table| {
            let Some(store) = store_ref.upgrade() else {
                return;
            };
            match query(&store) {
                Ok(value) => {
                    tx.send_replace(value);
                }
                // keep serving the last good result
                Err(e) => warn!("Refreshing live query after {:?} change failed: {}", table, e),
            }
        });

        Ok(Self {
            rx,
            _subscription: subscription,
        })
    }

    /// Snapshot of the current result
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// True if a refresh landed since the last `current_and_mark_seen` or `changed`
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    pub fn current_and_mark_seen(&mut self) -> T {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next refresh. `false` means no refresh can ever come.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("current", &*self.rx.borrow())
            .finish()
    }
}
