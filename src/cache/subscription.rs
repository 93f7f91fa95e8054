//! Subscription handles returned by [`QueryCache::subscribe`].
//!
//! A handle is the unit of refcounting: while at least one exists for a key
//! the entry survives invalidation by refetching, and when the last one drops
//! the entry moves to the detached list and becomes eligible for eviction.

use tokio::sync::watch;

use crate::cache::entry::QuerySnapshot;
use crate::cache::keys::QueryKey;
use crate::cache::manager::QueryCache;
use crate::domain::entities::Keyed;

pub struct QuerySubscription<E: Keyed> {
    key: QueryKey,
    rx: watch::Receiver<QuerySnapshot<E>>,
    cache: QueryCache<E>,
}

impl<E: Keyed> QuerySubscription<E> {
    pub(crate) fn new(
        key: QueryKey,
        rx: watch::Receiver<QuerySnapshot<E>>,
        cache: QueryCache<E>,
    ) -> Self {
        Self { key, rx, cache }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// The latest published state of the entry.
    pub fn snapshot(&self) -> QuerySnapshot<E> {
        self.rx.borrow().clone()
    }

    /// Wait for the next published transition. Returns false when the cache
    /// itself has gone away.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the entry reaches a settled state (fulfilled or rejected)
    /// and return that snapshot.
    pub async fn settled(&mut self) -> QuerySnapshot<E> {
        loop {
            let snapshot = self.snapshot();
            if snapshot.is_settled() {
                return snapshot;
            }
            if !self.changed().await {
                return self.snapshot();
            }
        }
    }
}

impl<E> QuerySubscription<E>
where
    E: Keyed + Send + Sync + 'static,
    E::Id: Send + Sync,
{
    /// Re-trigger the query behind this handle. Returns false while a fetch
    /// is already in flight.
    pub fn refetch(&self) -> bool {
        self.cache.refetch_key(&self.key)
    }
}

impl<E: Keyed> Drop for QuerySubscription<E> {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}
