//! Collection-keyed value store.
//!
//! A two-level map: collections are created on demand the first time they
//! are written, but records within a collection are never auto-initialized.
//! Entities use this for their consideration records; the first-seen-wins
//! rule for considerations lives in the entity, not here; the store itself
//! is a plain last-write-wins map.

use std::collections::HashMap;

use serde_json::Value;

/// In-memory store of opaque values grouped into named collections.
#[derive(Debug, Default)]
pub struct Store {
    collections: HashMap<String, HashMap<String, Value>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record under `key` in `collection`, if present.
    pub fn get(&self, collection: &str, key: &str) -> Option<&Value> {
        self.collections.get(collection)?.get(key)
    }

    /// Inserts or replaces the record under `key` in `collection`,
    /// creating the collection if it does not exist yet.
    pub fn set(&mut self, collection: &str, key: &str, value: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Returns `true` if `collection` holds a record under `key`.
    pub fn has(&self, collection: &str, key: &str) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|c| c.contains_key(key))
    }

    /// Names of all collections that have been written to.
    pub fn list_collections(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_starts_empty() {
        let store = Store::new();
        assert!(store.list_collections().is_empty());
        assert!(store.get("considerations", "a").is_none());
    }

    #[test]
    fn test_set_creates_collection_on_demand() {
        let mut store = Store::new();
        store.set("considerations", "a", json!(1));
        assert_eq!(store.list_collections(), vec!["considerations"]);
        assert_eq!(store.get("considerations", "a"), Some(&json!(1)));
    }

    #[test]
    fn test_has_distinguishes_missing_key_from_missing_collection() {
        let mut store = Store::new();
        assert!(!store.has("considerations", "a"));
        store.set("considerations", "a", json!("x"));
        assert!(store.has("considerations", "a"));
        assert!(!store.has("considerations", "b"));
        assert!(!store.has("other", "a"));
    }

    #[test]
    fn test_set_replaces_existing_record() {
        let mut store = Store::new();
        store.set("c", "k", json!("first"));
        store.set("c", "k", json!("second"));
        assert_eq!(store.get("c", "k"), Some(&json!("second")));
    }
}
