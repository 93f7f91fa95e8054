//! Normalized posts cache: declarative queries with tag invalidation over a
//! REST posts API, plus a hand-rolled store for cache-free fetching.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
