//! Normalized entity storage: an ordered id list plus an id-to-entity map.

use std::collections::HashMap;

use crate::domain::entities::Keyed;

/// A normalized collection in the entity-adapter shape: `ids` holds every
/// entity id exactly once in first-seen order, `entities` maps each id to its
/// current record. The two views always cover the same id set.
#[derive(Debug, Clone)]
pub struct NormalizedCollection<T: Keyed> {
    ids: Vec<T::Id>,
    entities: HashMap<T::Id, T>,
}

impl<T: Keyed> Default for NormalizedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> NormalizedCollection<T> {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
        }
    }

    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut collection = Self::new();
        collection.set_all(items);
        collection
    }

    /// Replace the entire id/entity set. With duplicate ids in the input the
    /// first occurrence fixes the position and the last occurrence wins the
    /// fields.
    pub fn set_all(&mut self, items: impl IntoIterator<Item = T>) {
        self.ids.clear();
        self.entities.clear();
        self.upsert_many(items);
    }

    /// Merge each item by id: an existing id keeps its position and has its
    /// entity replaced, a new id is appended. Retained ids are never
    /// reordered.
    pub fn upsert_many(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            let id = item.key();
            if self.entities.insert(id.clone(), item).is_none() {
                self.ids.push(id);
            }
        }
    }

    pub fn ids(&self) -> &[T::Id] {
        &self.ids
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.entities.contains_key(id)
    }

    /// Iterate entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.ids.iter().filter_map(|id| self.entities.get(id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<T: Keyed + PartialEq> PartialEq for NormalizedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids && self.entities == other.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PostRecord;

    fn post(id: i64, title: &str) -> PostRecord {
        PostRecord::new(id, title, "desc")
    }

    fn titles(collection: &NormalizedCollection<PostRecord>) -> Vec<String> {
        collection.iter().map(|p| p.title.clone()).collect()
    }

    #[test]
    fn upsert_appends_new_ids_in_first_seen_order() {
        let mut collection = NormalizedCollection::new();
        collection.upsert_many([post(2, "b"), post(1, "a"), post(3, "c")]);
        assert_eq!(collection.ids(), &[2, 1, 3]);
        assert_eq!(titles(&collection), ["b", "a", "c"]);
    }

    #[test]
    fn upsert_replaces_fields_without_reordering() {
        let mut collection = NormalizedCollection::from_items([post(1, "a"), post(2, "b")]);
        collection.upsert_many([post(1, "a2")]);
        assert_eq!(collection.ids(), &[1, 2]);
        assert_eq!(
            collection.get(&1).map(|p| p.title.as_str()),
            Some("a2"),
            "later write wins"
        );
    }

    #[test]
    fn upsert_never_duplicates_ids() {
        let mut collection = NormalizedCollection::new();
        collection.upsert_many([post(1, "a"), post(1, "b"), post(1, "c")]);
        collection.upsert_many([post(1, "d")]);
        assert_eq!(collection.ids(), &[1]);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get(&1).map(|p| p.title.as_str()), Some("d"));
    }

    #[test]
    fn ids_and_entities_stay_in_parity() {
        let mut collection = NormalizedCollection::new();
        collection.upsert_many([post(5, "e"), post(4, "d")]);
        collection.set_all([post(9, "i"), post(5, "e"), post(9, "j")]);
        collection.upsert_many([post(4, "d"), post(9, "k")]);
        for id in collection.ids() {
            assert!(collection.get(id).is_some());
        }
        assert_eq!(collection.ids().len(), collection.len());
    }

    #[test]
    fn set_all_is_idempotent() {
        let items = [post(1, "a"), post(2, "b")];
        let mut first = NormalizedCollection::new();
        first.set_all(items.clone());
        let mut second = first.clone();
        second.set_all(items);
        assert_eq!(first, second);
    }

    #[test]
    fn set_all_collapses_duplicate_input_ids() {
        let collection =
            NormalizedCollection::from_items([post(1, "a"), post(2, "b"), post(1, "a2")]);
        assert_eq!(collection.ids(), &[1, 2], "first occurrence fixes position");
        assert_eq!(collection.get(&1).map(|p| p.title.as_str()), Some("a2"));
    }

    #[test]
    fn set_all_discards_previous_contents() {
        let mut collection = NormalizedCollection::from_items([post(1, "a"), post(2, "b")]);
        collection.set_all([post(3, "c")]);
        assert_eq!(collection.ids(), &[3]);
        assert!(!collection.contains(&1));
    }
}
