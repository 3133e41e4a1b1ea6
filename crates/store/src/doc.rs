//! Generic document-store seam.
//!
//! Documents are JSON values grouped into named collections; each document
//! may own named subcollections of items. There are no cross-document
//! transactions — callers must tolerate eventual visibility of writes
//! within a single key's subcollection.

use async_trait::async_trait;
use common::Result;
use serde_json::Value;

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch a document, or `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Create or update a document. With `merge`, only the supplied
    /// top-level fields overwrite; other fields retain their prior values.
    /// Without `merge`, the document is replaced.
    async fn set(&self, collection: &str, id: &str, fields: Value, merge: bool) -> Result<()>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Write one item in a document's subcollection, replacing any prior
    /// item under the same `item_id`.
    async fn item_set(
        &self,
        collection: &str,
        id: &str,
        sub: &str,
        item_id: &str,
        doc: Value,
    ) -> Result<()>;

    /// Snapshot all items of a subcollection as `(item_id, doc)` pairs.
    /// Ordering is unspecified.
    async fn item_stream(&self, collection: &str, id: &str, sub: &str)
        -> Result<Vec<(String, Value)>>;

    /// Delete one subcollection item. Returns whether it existed.
    async fn item_delete(
        &self,
        collection: &str,
        id: &str,
        sub: &str,
        item_id: &str,
    ) -> Result<bool>;

    /// Enumerate the ids of every document in a collection, including ids
    /// that only exist as subcollection parents. One-shot snapshot.
    async fn list_ids(&self, collection: &str) -> Result<Vec<String>>;
}
