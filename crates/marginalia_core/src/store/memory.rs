//! In-memory document store.
//!
//! Thread-safe reference backend for embedding and tests. Collections are
//! insertion-ordered vectors behind one `RwLock`, so every primitive is
//! atomic with respect to the others.

use super::{apply_patch, document_id, Document, DocumentStore, Filter, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Collections = HashMap<String, Vec<Document>>;

/// Volatile document store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub fn len(&self, collection: &str) -> StoreResult<usize> {
        Ok(self.read()?.get(collection).map_or(0, Vec::len))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|_| StoreError::Poisoned("memory collections"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|_| StoreError::Poisoned("memory collections"))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let guard = self.read()?;
        Ok(guard
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| filter.matches(document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert(&self, collection: &str, document: Document) -> StoreResult<()> {
        let id = document_id(&document)?;
        let mut guard = self.write()?;
        let documents = guard.entry(collection.to_string()).or_default();
        let taken = Filter::id(&id);
        if documents.iter().any(|existing| taken.matches(existing)) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id,
            });
        }
        documents.push(document);
        Ok(())
    }

    fn update_one(&self, collection: &str, filter: &Filter, patch: &Document) -> StoreResult<u64> {
        let mut guard = self.write()?;
        let Some(target) = guard
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|document| filter.matches(document)))
        else {
            return Ok(0);
        };
        apply_patch(target, patch)?;
        Ok(1)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut guard = self.write()?;
        let Some(documents) = guard.get_mut(collection) else {
            return Ok(0);
        };
        match documents.iter().position(|document| filter.matches(document)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut guard = self.write()?;
        let Some(documents) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|document| !filter.matches(document));
        Ok((before - documents.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryDocumentStore;
    use crate::store::{Document, DocumentStore, Filter, StoreError};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn find_preserves_insertion_order_per_collection() {
        let store = MemoryDocumentStore::new();
        for id in ["c", "a", "b"] {
            store.insert("items", doc(json!({"_id": id}))).unwrap();
        }
        store.insert("other", doc(json!({"_id": "z"}))).unwrap();

        let ids: Vec<_> = store
            .find("items", &Filter::All)
            .unwrap()
            .into_iter()
            .map(|document| document["_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);
        assert_eq!(store.len("other").unwrap(), 1);
        assert!(store.find("absent", &Filter::All).unwrap().is_empty());
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let store = MemoryDocumentStore::new();
        store.insert("items", doc(json!({"_id": "x"}))).unwrap();
        let err = store.insert("items", doc(json!({"_id": "x"}))).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { ref id, .. } if id == "x"));
        store.insert("others", doc(json!({"_id": "x"}))).unwrap();
    }

    #[test]
    fn update_and_delete_report_counts() {
        let store = MemoryDocumentStore::new();
        for (id, parent) in [("a", "p"), ("b", "p"), ("c", "q")] {
            store
                .insert("items", doc(json!({"_id": id, "parentId": parent})))
                .unwrap();
        }

        let patch = doc(json!({"parentId": "r"}));
        assert_eq!(store.update_one("items", &Filter::id("c"), &patch).unwrap(), 1);
        assert_eq!(store.update_one("items", &Filter::id("zz"), &patch).unwrap(), 0);

        assert_eq!(
            store
                .delete_many("items", &Filter::field_eq("parentId", "p"))
                .unwrap(),
            2
        );
        assert_eq!(store.delete_one("items", &Filter::id("c")).unwrap(), 1);
        assert_eq!(store.delete_one("items", &Filter::id("c")).unwrap(), 0);
        assert_eq!(store.delete_many("nothing", &Filter::All).unwrap(), 0);
    }
}
