//! Bidirectional tag registry.
//!
//! Tracks which cache entries provided which invalidation tags, enabling
//! efficient lookup of the entries a mutation touches.

use std::collections::{HashMap, HashSet};

use super::keys::{QueryKey, Tag};

/// Tracks tag → query_keys and query_key → tags mappings.
///
/// This bidirectional mapping enables:
/// - Finding all cache entries affected by an invalidated tag
/// - Cleaning up tag mappings when a cache entry is evicted
///
/// The registry is a plain data structure; the owning cache serializes all
/// access behind its state lock.
#[derive(Debug, Default)]
pub struct TagRegistry {
    /// Maps tags to all query keys that provided them
    tag_to_keys: HashMap<Tag, HashSet<QueryKey>>,
    /// Maps query keys to all tags they provided
    key_to_tags: HashMap<QueryKey, HashSet<Tag>>,
}

impl TagRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tags provided by a fulfilled cache entry.
    ///
    /// Replaces any earlier registration for the same key, so a refetch that
    /// provides a different tag set drops the stale links.
    pub fn register(&mut self, key: &QueryKey, tags: impl IntoIterator<Item = Tag>) {
        self.unregister(key);
        let tags: HashSet<Tag> = tags.into_iter().collect();
        for tag in &tags {
            self.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.key_to_tags.insert(key.clone(), tags);
    }

    /// Get all query keys affected by an invalidated tag.
    pub fn keys_for_tag(&self, tag: &Tag) -> HashSet<QueryKey> {
        self.tag_to_keys.get(tag).cloned().unwrap_or_default()
    }

    /// Remove a query key and clean up its tag mappings.
    ///
    /// Called when a cache entry is evicted.
    pub fn unregister(&mut self, key: &QueryKey) {
        if let Some(tags) = self.key_to_tags.remove(key) {
            for tag in tags {
                if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tag_to_keys.remove(&tag);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
impl TagRegistry {
    fn tags_for_key(&self, key: &QueryKey) -> HashSet<Tag> {
        self.key_to_tags.get(key).cloned().unwrap_or_default()
    }

    fn tag_count(&self) -> usize {
        self.tag_to_keys.len()
    }

    fn key_count(&self) -> usize {
        self.key_to_tags.len()
    }
}
