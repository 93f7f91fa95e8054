//! Declarative query cache.
//!
//! Endpoints are registered up front with their fetch, transform and tag
//! wiring; consumers subscribe by endpoint name and arguments and observe a
//! stream of snapshots. Mutations invalidate tags, and the cache decides per
//! entry whether to refetch (subscribed) or drop (unsubscribed).

pub mod config;
pub mod endpoints;
pub mod entry;
pub mod error;
pub(crate) mod keys;
pub(crate) mod lock;
pub mod manager;
pub(crate) mod registry;
pub mod subscription;

pub use config::CacheConfig;
pub use endpoints::{EndpointRegistry, MutationDef, QueryDef};
pub use entry::{QuerySnapshot, QueryStatus};
pub use error::QueryError;
pub use keys::{QueryKey, Tag, TagId};
pub use manager::QueryCache;
pub use subscription::QuerySubscription;
