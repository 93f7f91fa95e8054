//! The query cache manager.
//!
//! One shared state lock serializes every transition: entry status changes,
//! tag registration, invalidation matching and eviction all apply in a single
//! stream, so observers can never see a half-applied step. Fetches themselves
//! run as spawned tasks and re-acquire the lock only to apply their outcome.
//!
//! The coalescing invariant lives in the explicit in-flight map: at most one
//! fetch per query key, checked before every spawn, and completions that lost
//! their sequence number are discarded.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use lru::LruCache;
use metrics::{counter, histogram};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::cache::config::CacheConfig;
use crate::cache::endpoints::EndpointRegistry;
use crate::cache::entry::{CacheEntry, QuerySnapshot, QueryStatus};
use crate::cache::error::QueryError;
use crate::cache::keys::{QueryKey, Tag};
use crate::cache::lock::mutex_lock;
use crate::cache::registry::TagRegistry;
use crate::cache::subscription::QuerySubscription;
use crate::domain::entities::Keyed;

pub(crate) struct CacheState<E: Keyed> {
    entries: HashMap<QueryKey, CacheEntry<E>>,
    registry: TagRegistry,
    /// Explicit in-flight map: query key to fetch sequence number.
    inflight: HashMap<QueryKey, u64>,
    /// Zero-subscriber entries, oldest evicted first once over capacity.
    detached: LruCache<QueryKey, ()>,
    next_fetch_seq: u64,
}

struct CacheInner<E: Keyed> {
    endpoints: EndpointRegistry<E>,
    state: Mutex<CacheState<E>>,
}

/// Shared handle to one query cache. Clones refer to the same cache.
pub struct QueryCache<E: Keyed> {
    inner: Arc<CacheInner<E>>,
}

impl<E: Keyed> Clone for QueryCache<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Keyed> QueryCache<E> {
    pub fn new(endpoints: EndpointRegistry<E>, config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                endpoints,
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    registry: TagRegistry::new(),
                    inflight: HashMap::new(),
                    detached: LruCache::new(config.detached_entry_limit_non_zero()),
                    next_fetch_seq: 0,
                }),
            }),
        }
    }

    fn state(&self, op: &'static str) -> MutexGuard<'_, CacheState<E>> {
        mutex_lock(&self.inner.state, "query_cache", op)
    }

    /// Current state of an entry without subscribing. Unknown endpoints and
    /// never-fetched keys read as uninitialized.
    pub fn peek(&self, endpoint: &str, args: &Value) -> QuerySnapshot<E> {
        let Some(def) = self.inner.endpoints.query(endpoint) else {
            return QuerySnapshot::uninitialized();
        };
        let key = QueryKey::new(def.name, args);
        let state = self.state("peek");
        state
            .entries
            .get(&key)
            .map(CacheEntry::snapshot)
            .unwrap_or_else(QuerySnapshot::uninitialized)
    }

    /// `(entries, detached, in_flight)` counts, for diagnostics and tests.
    pub fn counts(&self) -> (usize, usize, usize) {
        let state = self.state("counts");
        (
            state.entries.len(),
            state.detached.len(),
            state.inflight.len(),
        )
    }

    pub(crate) fn release(&self, key: &QueryKey) {
        let mut state = self.state("release");
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return;
        }
        debug!(key = %key, "last subscriber dropped; entry detached");
        if let Some((evicted, ())) = state.detached.push(key.clone(), ()) {
            if evicted != *key {
                evict_locked(&mut state, &evicted);
            }
        }
    }
}

impl<E> QueryCache<E>
where
    E: Keyed + Send + Sync + 'static,
    E::Id: Send + Sync,
{
    /// Subscribe to a query, fetching on first use and sharing in-flight or
    /// cached results with every other subscriber of the same key.
    pub fn subscribe(
        &self,
        endpoint: &str,
        args: Value,
    ) -> Result<QuerySubscription<E>, QueryError> {
        let Some(def) = self.inner.endpoints.query(endpoint) else {
            return Err(QueryError::unknown_query(endpoint));
        };
        let key = QueryKey::new(def.name, &args);

        let mut state = self.state("subscribe");
        counter!("fresca_cache_subscriptions_total").increment(1);
        state.detached.pop(&key);
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(args.clone()));
        entry.subscribers += 1;
        let rx = entry.tx.subscribe();
        let status = entry.status;
        match status {
            QueryStatus::Uninitialized => {
                counter!("fresca_cache_miss_total").increment(1);
                self.start_fetch(&mut state, &key, args);
            }
            QueryStatus::Pending => {
                counter!("fresca_cache_coalesced_total").increment(1);
                debug!(key = %key, "subscription joined in-flight fetch");
            }
            QueryStatus::Fulfilled | QueryStatus::Rejected => {
                counter!("fresca_cache_hit_total").increment(1);
                debug!(key = %key, status = status.as_str(), "subscription served from cache");
            }
        }
        drop(state);

        Ok(QuerySubscription::new(key, rx, self.clone()))
    }

    /// Run a mutation. On success the endpoint's declared tags are
    /// invalidated: subscribed providers refetch, unsubscribed ones are
    /// dropped. A failed mutation invalidates nothing.
    pub async fn mutate(&self, endpoint: &str, args: Value) -> Result<Value, QueryError> {
        let Some(def) = self.inner.endpoints.mutation(endpoint) else {
            return Err(QueryError::unknown_mutation(endpoint));
        };
        let name = def.name;
        let execute = Arc::clone(&def.execute);
        let invalidates = Arc::clone(&def.invalidates);

        counter!("fresca_mutation_total").increment(1);
        debug!(endpoint = name, "mutation started");
        let result = match (execute)(args.clone()).await {
            Ok(value) => value,
            Err(err) => {
                warn!(endpoint = name, error = %err, "mutation failed; no tags invalidated");
                return Err(err);
            }
        };

        let tags = (invalidates)(&args);
        self.invalidate(&tags);
        Ok(result)
    }

    /// Apply invalidation tags to every entry that provided them.
    pub fn invalidate(&self, tags: &[Tag]) {
        if tags.is_empty() {
            return;
        }
        let mut state = self.state("invalidate");
        let mut touched: HashSet<QueryKey> = HashSet::new();
        for tag in tags {
            touched.extend(state.registry.keys_for_tag(tag));
        }
        let labels: Vec<String> = tags.iter().map(ToString::to_string).collect();
        if touched.is_empty() {
            debug!(tags = ?labels, "invalidation matched no entries");
            return;
        }
        info!(tags = ?labels, entries = touched.len(), "cache invalidation applied");
        counter!("fresca_cache_invalidated_total").increment(touched.len() as u64);

        for key in touched {
            let Some(entry) = state.entries.get(&key) else {
                continue;
            };
            if entry.subscribers == 0 {
                debug!(key = %key, "invalidated entry had no subscribers; dropped");
                evict_locked(&mut state, &key);
                continue;
            }
            if state.inflight.contains_key(&key) {
                if let Some(entry) = state.entries.get_mut(&key) {
                    entry.needs_refetch = true;
                }
                debug!(key = %key, "invalidated while fetch in flight; follow-up queued");
                continue;
            }
            let Some(args) = state.entries.get(&key).map(|e| e.args.clone()) else {
                continue;
            };
            counter!("fresca_cache_refetch_total").increment(1);
            self.start_fetch(&mut state, &key, args);
        }
    }

    /// Manually re-trigger a query. Returns false when the key is unknown or
    /// a fetch is already in flight.
    pub fn refetch(&self, endpoint: &str, args: &Value) -> bool {
        let Some(def) = self.inner.endpoints.query(endpoint) else {
            return false;
        };
        self.refetch_key(&QueryKey::new(def.name, args))
    }

    pub(crate) fn refetch_key(&self, key: &QueryKey) -> bool {
        let mut state = self.state("refetch");
        if state.inflight.contains_key(key) {
            return false;
        }
        let Some(args) = state.entries.get(key).map(|e| e.args.clone()) else {
            return false;
        };
        counter!("fresca_cache_refetch_total").increment(1);
        self.start_fetch(&mut state, key, args);
        true
    }

    fn start_fetch(&self, state: &mut CacheState<E>, key: &QueryKey, args: Value) {
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };
        let seq = state.next_fetch_seq;
        state.next_fetch_seq += 1;
        state.inflight.insert(key.clone(), seq);
        entry.status = QueryStatus::Pending;
        entry.error = None;
        entry.publish();
        counter!("fresca_cache_fetch_total").increment(1);
        debug!(key = %key, seq, first_load = entry.data.is_none(), "query fetch started");

        let cache = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            cache.run_fetch(key, seq, args).await;
        });
    }

    async fn run_fetch(&self, key: QueryKey, seq: u64, args: Value) {
        let Some(def) = self.inner.endpoints.query(key.endpoint) else {
            return;
        };
        let fetch = Arc::clone(&def.fetch);
        let transform = Arc::clone(&def.transform);
        let provides = Arc::clone(&def.provides);

        let started = Instant::now();
        let outcome = match (fetch)(args.clone()).await {
            Ok(raw) => (transform)(raw),
            Err(err) => Err(err),
        };
        histogram!("fresca_query_fetch_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let mut state = self.state("apply_fetch");
        if state.inflight.get(&key) != Some(&seq) {
            debug!(key = %key, seq, "discarding superseded fetch result");
            return;
        }
        state.inflight.remove(&key);

        match outcome {
            Ok(data) => {
                let tags = (provides)(&args, &data);
                state.registry.register(&key, tags);
                let Some(entry) = state.entries.get_mut(&key) else {
                    return;
                };
                entry.data = Some(Arc::new(data));
                entry.status = QueryStatus::Fulfilled;
                entry.error = None;
                entry.fulfilled_at = Some(OffsetDateTime::now_utc());
                entry.publish();
                counter!("fresca_query_fulfilled_total").increment(1);
                debug!(key = %key, epoch = entry.epoch, "query fulfilled");
            }
            Err(err) => {
                let Some(entry) = state.entries.get_mut(&key) else {
                    return;
                };
                entry.status = QueryStatus::Rejected;
                entry.error = Some(err.clone());
                entry.publish();
                counter!("fresca_query_rejected_total").increment(1);
                warn!(key = %key, error = %err, "query rejected");
            }
        }

        let follow_up = state.entries.get_mut(&key).and_then(|entry| {
            let wanted = entry.needs_refetch && entry.subscribers > 0;
            entry.needs_refetch = false;
            wanted.then(|| entry.args.clone())
        });
        if let Some(args) = follow_up {
            counter!("fresca_cache_refetch_total").increment(1);
            self.start_fetch(&mut state, &key, args);
        }
    }
}

fn evict_locked<E: Keyed>(state: &mut CacheState<E>, key: &QueryKey) {
    if state.entries.remove(key).is_some() {
        state.registry.unregister(key);
        state.inflight.remove(key);
        state.detached.pop(key);
        counter!("fresca_cache_evicted_total").increment(1);
        debug!(key = %key, "cache entry evicted");
    }
}
