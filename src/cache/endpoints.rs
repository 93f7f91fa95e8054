//! Explicit endpoint registry.
//!
//! Queries and mutations are declared as named closure sets instead of
//! generated hooks: a query carries `{fetch, transform, provides}`, a
//! mutation `{execute, invalidates}`. The cache manager drives them by name.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::cache::error::QueryError;
use crate::cache::keys::Tag;
use crate::domain::collection::NormalizedCollection;
use crate::domain::entities::Keyed;

/// Fetch the raw response for a query, given its arguments.
pub type FetchFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, QueryError>> + Send + Sync>;

/// Shape the raw response into the normalized collection that gets cached.
pub type TransformFn<E> =
    Arc<dyn Fn(Value) -> Result<NormalizedCollection<E>, QueryError> + Send + Sync>;

/// Tags a fulfilled result provides, derived from arguments and data.
pub type ProvidesFn<E> =
    Arc<dyn Fn(&Value, &NormalizedCollection<E>) -> Vec<Tag> + Send + Sync>;

/// Run a side-effecting request, returning the raw response body.
pub type ExecuteFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, QueryError>> + Send + Sync>;

/// Tags a successful mutation invalidates, derived from its arguments.
pub type InvalidatesFn = Arc<dyn Fn(&Value) -> Vec<Tag> + Send + Sync>;

/// One cached, subscribable read endpoint.
#[derive(Clone)]
pub struct QueryDef<E: Keyed> {
    pub name: &'static str,
    pub fetch: FetchFn,
    pub transform: TransformFn<E>,
    pub provides: ProvidesFn<E>,
}

/// One side-effecting endpoint with declared invalidations.
#[derive(Clone)]
pub struct MutationDef {
    pub name: &'static str,
    pub execute: ExecuteFn,
    pub invalidates: InvalidatesFn,
}

/// Named lookup table for every endpoint the cache can drive.
pub struct EndpointRegistry<E: Keyed> {
    queries: HashMap<&'static str, QueryDef<E>>,
    mutations: HashMap<&'static str, MutationDef>,
}

impl<E: Keyed> Default for EndpointRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Keyed> EndpointRegistry<E> {
    pub fn new() -> Self {
        Self {
            queries: HashMap::new(),
            mutations: HashMap::new(),
        }
    }

    /// Register a query endpoint. A later registration under the same name
    /// replaces the earlier one.
    pub fn register_query(&mut self, def: QueryDef<E>) {
        self.queries.insert(def.name, def);
    }

    /// Register a mutation endpoint. A later registration under the same
    /// name replaces the earlier one.
    pub fn register_mutation(&mut self, def: MutationDef) {
        self.mutations.insert(def.name, def);
    }

    pub fn query(&self, name: &str) -> Option<&QueryDef<E>> {
        self.queries.get(name)
    }

    pub fn mutation(&self, name: &str) -> Option<&MutationDef> {
        self.mutations.get(name)
    }
}
