//! Cache configuration.
//!
//! Controls entry retention for the query cache via `fresca.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_DETACHED_ENTRY_LIMIT: usize = 64;

/// Cache configuration from `fresca.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum zero-subscriber entries retained before LRU eviction.
    pub detached_entry_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            detached_entry_limit: DEFAULT_DETACHED_ENTRY_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            detached_entry_limit: settings.detached_entry_limit,
        }
    }
}

impl CacheConfig {
    /// Returns the detached entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn detached_entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.detached_entry_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
