//! Per-key cache entry state and the snapshots subscribers observe.

use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::watch;

use crate::cache::error::QueryError;
use crate::domain::collection::NormalizedCollection;
use crate::domain::entities::Keyed;

/// Fetch lifecycle of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Uninitialized,
    Pending,
    Fulfilled,
    Rejected,
}

impl QueryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Uninitialized => "uninitialized",
            QueryStatus::Pending => "pending",
            QueryStatus::Fulfilled => "fulfilled",
            QueryStatus::Rejected => "rejected",
        }
    }
}

/// Point-in-time view of one cache entry, delivered to every subscriber on
/// each applied transition.
#[derive(Debug)]
pub struct QuerySnapshot<E: Keyed> {
    pub status: QueryStatus,
    pub data: Option<Arc<NormalizedCollection<E>>>,
    pub error: Option<QueryError>,
    /// Monotonic transition counter; strictly increases per applied change.
    pub epoch: u64,
    pub fulfilled_at: Option<OffsetDateTime>,
}

impl<E: Keyed> Clone for QuerySnapshot<E> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            epoch: self.epoch,
            fulfilled_at: self.fulfilled_at,
        }
    }
}

impl<E: Keyed> QuerySnapshot<E> {
    pub fn uninitialized() -> Self {
        Self {
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            epoch: 0,
            fulfilled_at: None,
        }
    }

    /// First load in progress: pending with nothing cached yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_none()
    }

    /// Any fetch in progress, including refetches over cached data.
    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status, QueryStatus::Fulfilled | QueryStatus::Rejected)
    }
}

pub(crate) struct CacheEntry<E: Keyed> {
    pub(crate) status: QueryStatus,
    pub(crate) data: Option<Arc<NormalizedCollection<E>>>,
    pub(crate) error: Option<QueryError>,
    /// Original argument value, kept so invalidation can refetch.
    pub(crate) args: Value,
    pub(crate) subscribers: usize,
    pub(crate) epoch: u64,
    pub(crate) fulfilled_at: Option<OffsetDateTime>,
    /// Set when a tag invalidates this entry while a fetch is in flight.
    pub(crate) needs_refetch: bool,
    pub(crate) tx: watch::Sender<QuerySnapshot<E>>,
}

impl<E: Keyed> CacheEntry<E> {
    pub(crate) fn new(args: Value) -> Self {
        Self {
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            args,
            subscribers: 0,
            epoch: 0,
            fulfilled_at: None,
            needs_refetch: false,
            tx: watch::Sender::new(QuerySnapshot::uninitialized()),
        }
    }

    pub(crate) fn snapshot(&self) -> QuerySnapshot<E> {
        QuerySnapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            epoch: self.epoch,
            fulfilled_at: self.fulfilled_at,
        }
    }

    /// Bump the epoch and push the current state to all subscribers.
    pub(crate) fn publish(&mut self) {
        self.epoch += 1;
        let snapshot = self.snapshot();
        self.tx.send_replace(snapshot);
    }
}
