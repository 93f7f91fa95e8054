//! Cache key types.
//!
//! Two identities matter here: the [`QueryKey`] that names one cache entry
//! (endpoint plus canonically serialized arguments) and the [`Tag`] labels
//! that entries provide and mutations invalidate.

use std::fmt;

use serde_json::Value;

/// Invalidation label attached to cached query results.
///
/// Matching is exact equality on `(kind, id)`; there are no wildcards. In
/// particular `(kind, LIST)` is an ordinary label, not a prefix that covers
/// the per-entity tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: &'static str,
    pub id: TagId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagId {
    /// The collection-level sentinel (the original API's `"LIST"` id).
    List,
    /// A single entity, keyed by its canonical string form.
    Entity(String),
}

impl Tag {
    pub fn list(kind: &'static str) -> Self {
        Self {
            kind,
            id: TagId::List,
        }
    }

    pub fn entity(kind: &'static str, id: impl ToString) -> Self {
        Self {
            kind,
            id: TagId::Entity(id.to_string()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            TagId::List => write!(f, "({}, LIST)", self.kind),
            TagId::Entity(id) => write!(f, "({}, {})", self.kind, id),
        }
    }
}

/// Identity of one cache entry: the endpoint name plus its canonically
/// serialized arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub endpoint: &'static str,
    pub args: String,
}

impl QueryKey {
    pub fn new(endpoint: &'static str, args: &Value) -> Self {
        Self {
            endpoint,
            args: canonical_args(args),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

/// Serialize arguments into their canonical key form.
///
/// serde_json object maps iterate in sorted key order (the `preserve_order`
/// feature is not enabled), so equal values always serialize to equal keys.
pub fn canonical_args(args: &Value) -> String {
    args.to_string()
}
