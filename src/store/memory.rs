//! In-process document store
//!
//! Holds collections in memory behind a `tokio` read-write lock. Used by the
//! binary and as the test double for the hosted database.

use async_trait::async_trait;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

use super::{CollectionRef, Document, DocumentStore, Query, WriteBatch, WriteKind};
use crate::error::StoreError;

type Collection = BTreeMap<String, Document>;

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn len(&self, collection: &CollectionRef) -> usize {
        self.collections
            .read()
            .await
            .get(&collection.path())
            .map(|c| c.len())
            .unwrap_or(0)
    }

    pub async fn is_empty(&self, collection: &CollectionRef) -> bool {
        self.len(collection).await == 0
    }
}

fn not_found(collection: &CollectionRef, id: &str) -> StoreError {
    StoreError::NotFound {
        collection: collection.path(),
        id: id.to_string(),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn set(&self, collection: &CollectionRef, id: &str, doc: Document) -> Result<(), StoreError> {
        debug!("set {}/{}", collection, id);
        self.collections
            .write()
            .await
            .entry(collection.path())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn get(&self, collection: &CollectionRef, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection.path())
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn update(&self, collection: &CollectionRef, id: &str, fields: Document) -> Result<(), StoreError> {
        debug!("update {}/{}", collection, id);
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(&collection.path())
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| not_found(collection, id))?;
        doc.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &CollectionRef, id: &str) -> Result<(), StoreError> {
        debug!("delete {}/{}", collection, id);
        if let Some(c) = self.collections.write().await.get_mut(&collection.path()) {
            c.remove(id);
        }
        Ok(())
    }

    async fn query(&self, collection: &CollectionRef, query: &Query) -> Result<Vec<(String, Document)>, StoreError> {
        let collections = self.collections.read().await;
        let mut results: Vec<(String, Document)> = collections
            .get(&collection.path())
            .map(|c| {
                c.iter()
                    .filter(|(_, doc)| query.matches(doc))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        query.sort(&mut results);
        Ok(results)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;

        // Every update target must exist, or be set earlier in the batch, before anything is written
        let mut pending: HashSet<(String, &str)> = HashSet::new();
        for write in batch.writes() {
            let key = (write.collection.path(), write.id.as_str());
            match write.kind {
                WriteKind::Set => {
                    pending.insert(key);
                }
                WriteKind::Delete => {
                    pending.remove(&key);
                }
                WriteKind::Update => {
                    let exists = pending.contains(&key)
                        || collections
                            .get(&key.0)
                            .is_some_and(|c| c.contains_key(key.1));
                    if !exists {
                        return Err(not_found(&write.collection, &write.id));
                    }
                }
            }
        }
        drop(pending);

        let count = batch.len();
        for write in batch.into_writes() {
            let collection = collections.entry(write.collection.path()).or_default();
            match write.kind {
                WriteKind::Set => {
                    collection.insert(write.id, write.fields);
                }
                WriteKind::Update => {
                    if let Some(doc) = collection.get_mut(&write.id) {
                        doc.extend(write.fields);
                    }
                }
                WriteKind::Delete => {
                    collection.remove(&write.id);
                }
            }
        }
        debug!("committed batch of {} writes", count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Direction, single_field};
    use serde_json::json;

    fn files() -> CollectionRef {
        CollectionRef::files("p1")
    }

    #[tokio::test]
    async fn set_overwrites_and_delete_is_idempotent() {
        let store = MemoryDocumentStore::new();
        store.set(&files(), "a", single_field("v", 1)).await.unwrap();
        store.set(&files(), "a", single_field("v", 2)).await.unwrap();
        assert_eq!(store.get(&files(), "a").await.unwrap().unwrap()["v"], json!(2));

        store.delete(&files(), "a").await.unwrap();
        store.delete(&files(), "a").await.unwrap();
        assert!(store.is_empty(&files()).await);
    }

    #[tokio::test]
    async fn update_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        let err = store.update(&files(), "nope", single_field("v", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn commit_is_all_or_nothing() {
        let store = MemoryDocumentStore::new();
        store.set(&files(), "a", single_field("path", "/old")).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.update(&files(), "a", single_field("path", "/new"));
        batch.update(&files(), "missing", single_field("path", "/new"));
        assert!(store.commit(batch).await.is_err());
        assert_eq!(store.get(&files(), "a").await.unwrap().unwrap()["path"], json!("/old"));
    }

    #[tokio::test]
    async fn commit_applies_sets_and_deletes_in_order() {
        let store = MemoryDocumentStore::new();
        store.set(&files(), "old", single_field("path", "/a")).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.set(&files(), "new", single_field("path", "/a"));
        batch.update(&files(), "new", single_field("path", "/b"));
        batch.delete(&files(), "old");
        store.commit(batch).await.unwrap();

        assert!(store.get(&files(), "old").await.unwrap().is_none());
        assert_eq!(store.get(&files(), "new").await.unwrap().unwrap()["path"], json!("/b"));
    }

    #[tokio::test]
    async fn collections_are_isolated_per_project() {
        let store = MemoryDocumentStore::new();
        store.set(&files(), "a", single_field("n", 1)).await.unwrap();
        let other = CollectionRef::files("p2");
        let results = store
            .query(&other, &Query::new().order_by("n", Direction::Ascending))
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
