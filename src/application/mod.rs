//! Application services built on the domain and cache layers.

pub mod error;
pub mod posts;
pub mod posts_store;
