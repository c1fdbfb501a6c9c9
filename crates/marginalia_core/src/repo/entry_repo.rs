//! Entry repository contract and document-store implementation.
//!
//! # Invariants
//! - `create` assigns identity and timestamps exactly once.
//! - `update` keeps `_id`/`createdAt`, refreshes `updatedAt`, and returns the
//!   state read back from the store.
//! - Absent ids on `update`/`delete` are reported as `NotFound`.

use super::{decode, encode, not_found, RepoResult, ENTRIES_COLLECTION};
use crate::model::entry::{Entry, EntryDraft};
use crate::model::identity::{assign_if_absent, new_identifier};
use crate::model::timestamp::{format_instant, TimestampPolicy};
use crate::model::validation::validate_entry;
use crate::model::AggregateKind;
use crate::store::{Document, DocumentStore, Filter};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

/// Repository interface for entry CRUD operations.
pub trait EntryRepository: Send + Sync {
    fn create(&self, draft: &EntryDraft) -> RepoResult<Entry>;
    fn get_by_id(&self, id: &str) -> RepoResult<Option<Entry>>;
    fn list_all(&self) -> RepoResult<Vec<Entry>>;
    fn update(&self, id: &str, draft: &EntryDraft) -> RepoResult<Entry>;
    /// Removes the entry and returns what was removed.
    fn delete(&self, id: &str) -> RepoResult<Entry>;
}

/// Entry repository backed by any [`DocumentStore`].
pub struct DocumentEntryRepository<S: ?Sized> {
    store: Arc<S>,
    timestamps: TimestampPolicy,
}

impl<S: DocumentStore + ?Sized> DocumentEntryRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_timestamps(store, TimestampPolicy::default())
    }

    pub fn with_timestamps(store: Arc<S>, timestamps: TimestampPolicy) -> Self {
        Self { store, timestamps }
    }
}

impl<S: DocumentStore + ?Sized> EntryRepository for DocumentEntryRepository<S> {
    fn create(&self, draft: &EntryDraft) -> RepoResult<Entry> {
        let fields = validate_entry(draft)?;
        let id = assign_if_absent(draft.clone())
            .id
            .unwrap_or_else(new_identifier);
        let entry = Entry::from_parts(id, fields, self.timestamps.stamp_create());

        self.store
            .insert(ENTRIES_COLLECTION, encode(&entry, ENTRIES_COLLECTION)?)?;
        debug!(
            "event=entry_insert module=repo status=ok entry_id={}",
            entry.id
        );
        Ok(entry)
    }

    fn get_by_id(&self, id: &str) -> RepoResult<Option<Entry>> {
        self.store
            .find_one(ENTRIES_COLLECTION, &Filter::id(id))?
            .map(|document| decode(document, ENTRIES_COLLECTION))
            .transpose()
    }

    fn list_all(&self) -> RepoResult<Vec<Entry>> {
        self.store
            .find(ENTRIES_COLLECTION, &Filter::All)?
            .into_iter()
            .map(|document| decode(document, ENTRIES_COLLECTION))
            .collect()
    }

    fn update(&self, id: &str, draft: &EntryDraft) -> RepoResult<Entry> {
        let fields = validate_entry(draft)?;
        let existing = self
            .get_by_id(id)?
            .ok_or_else(|| not_found(AggregateKind::Entry, id))?;
        let stamp = self.timestamps.stamp_update(&existing);

        let mut patch = Document::new();
        patch.insert("title".to_string(), Value::String(fields.title));
        patch.insert("content".to_string(), Value::String(fields.content));
        patch.insert(
            "updatedAt".to_string(),
            Value::String(format_instant(&stamp.updated_at)),
        );

        if self
            .store
            .update_one(ENTRIES_COLLECTION, &Filter::id(id), &patch)?
            == 0
        {
            return Err(not_found(AggregateKind::Entry, id));
        }
        debug!("event=entry_update module=repo status=ok entry_id={id}");

        self.get_by_id(id)?
            .ok_or_else(|| not_found(AggregateKind::Entry, id))
    }

    fn delete(&self, id: &str) -> RepoResult<Entry> {
        let existing = self
            .get_by_id(id)?
            .ok_or_else(|| not_found(AggregateKind::Entry, id))?;
        if self
            .store
            .delete_one(ENTRIES_COLLECTION, &Filter::id(id))?
            == 0
        {
            return Err(not_found(AggregateKind::Entry, id));
        }
        debug!("event=entry_delete module=repo status=ok entry_id={id}");
        Ok(existing)
    }
}
