//! In-process document store backed by `DashMap`.
//!
//! The bundled implementation of [`DocumentStore`]; a deployment against a
//! hosted document database swaps this type without touching the core.

use crate::doc::DocumentStore;
use async_trait::async_trait;
use common::Result;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Thread-safe in-process document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// `(collection, id)` → document.
    docs: DashMap<(String, String), Value>,
    /// `(collection, id, sub)` → item map.
    items: DashMap<(String, String, String), BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn merge_fields(existing: &mut Value, fields: Value) {
    match (existing.as_object_mut(), fields) {
        (Some(obj), Value::Object(new_fields)) => {
            for (k, v) in new_fields {
                obj.insert(k, v);
            }
        }
        (_, replacement) => *existing = replacement,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .docs
            .get(&(collection.to_string(), id.to_string()))
            .map(|doc| doc.clone()))
    }

    async fn set(&self, collection: &str, id: &str, fields: Value, merge: bool) -> Result<()> {
        let key = (collection.to_string(), id.to_string());
        if merge {
            let mut entry = self.docs.entry(key).or_insert(Value::Object(Default::default()));
            merge_fields(entry.value_mut(), fields);
        } else {
            self.docs.insert(key, fields);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self
            .docs
            .remove(&(collection.to_string(), id.to_string()))
            .is_some())
    }

    async fn item_set(
        &self,
        collection: &str,
        id: &str,
        sub: &str,
        item_id: &str,
        doc: Value,
    ) -> Result<()> {
        let key = (collection.to_string(), id.to_string(), sub.to_string());
        self.items
            .entry(key)
            .or_default()
            .insert(item_id.to_string(), doc);
        Ok(())
    }

    async fn item_stream(
        &self,
        collection: &str,
        id: &str,
        sub: &str,
    ) -> Result<Vec<(String, Value)>> {
        let key = (collection.to_string(), id.to_string(), sub.to_string());
        Ok(self
            .items
            .get(&key)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn item_delete(
        &self,
        collection: &str,
        id: &str,
        sub: &str,
        item_id: &str,
    ) -> Result<bool> {
        let key = (collection.to_string(), id.to_string(), sub.to_string());
        let Some(mut entry) = self.items.get_mut(&key) else {
            return Ok(false);
        };
        let existed = entry.remove(item_id).is_some();
        drop(entry);
        // Drop the map itself once its last item is gone so the parent id
        // stops being enumerated.
        self.items
            .remove_if(&key, |_, m| m.is_empty());
        Ok(existed)
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        let mut ids: BTreeSet<String> = BTreeSet::new();
        for entry in self.docs.iter() {
            if entry.key().0 == collection {
                ids.insert(entry.key().1.clone());
            }
        }
        for entry in self.items.iter() {
            if entry.key().0 == collection && !entry.value().is_empty() {
                ids.insert(entry.key().1.clone());
            }
        }
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_merge_keeps_other_fields() {
        let store = MemoryStore::new();
        store
            .set("air_quality", "Warsaw", json!({"name": "Warsaw", "last_update": "t1"}), true)
            .await
            .unwrap();
        store
            .set("air_quality", "Warsaw", json!({"last_update": "t2"}), true)
            .await
            .unwrap();

        let doc = store.get("air_quality", "Warsaw").await.unwrap().unwrap();
        assert_eq!(doc["name"], "Warsaw");
        assert_eq!(doc["last_update"], "t2");
    }

    #[tokio::test]
    async fn test_set_without_merge_replaces() {
        let store = MemoryStore::new();
        store
            .set("air_quality", "Warsaw", json!({"name": "Warsaw"}), false)
            .await
            .unwrap();
        store
            .set("air_quality", "Warsaw", json!({"last_update": "t2"}), false)
            .await
            .unwrap();

        let doc = store.get("air_quality", "Warsaw").await.unwrap().unwrap();
        assert!(doc.get("name").is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = MemoryStore::new();
        store
            .set("air_quality", "Warsaw", json!({"name": "Warsaw"}), false)
            .await
            .unwrap();

        assert!(store.delete("air_quality", "Warsaw").await.unwrap());
        assert!(!store.delete("air_quality", "Warsaw").await.unwrap());
        assert!(store.get("air_quality", "Warsaw").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_items_roundtrip_and_listing() {
        let store = MemoryStore::new();
        store
            .item_set("air_quality", "Warsaw", "history", "0", json!({"AQI": 40}))
            .await
            .unwrap();
        store
            .item_set("air_quality", "Warsaw", "history", "1", json!({"AQI": 50}))
            .await
            .unwrap();

        let items = store.item_stream("air_quality", "Warsaw", "history").await.unwrap();
        assert_eq!(items.len(), 2);

        // A key with only subcollection items is still enumerated.
        let ids = store.list_ids("air_quality").await.unwrap();
        assert_eq!(ids, vec!["Warsaw".to_string()]);

        assert!(store
            .item_delete("air_quality", "Warsaw", "history", "0")
            .await
            .unwrap());
        assert!(!store
            .item_delete("air_quality", "Warsaw", "history", "0")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_subcollection_not_listed() {
        let store = MemoryStore::new();
        store
            .item_set("air_quality", "Warsaw", "history", "0", json!({"AQI": 40}))
            .await
            .unwrap();
        store
            .item_delete("air_quality", "Warsaw", "history", "0")
            .await
            .unwrap();

        let ids = store.list_ids("air_quality").await.unwrap();
        assert!(ids.is_empty());
    }
}
