//! Annotation repository contract and document-store implementation.
//!
//! # Invariants
//! - `parentId` is written once at create time and never patched.
//! - `delete_by_parent` returns the removed annotations and never fails for
//!   zero matches.
//! - This repository does not check that the parent exists; the coordinator
//!   does.

use super::{decode, encode, not_found, RepoResult, ANNOTATIONS_COLLECTION};
use crate::model::annotation::{Annotation, AnnotationDraft, PARENT_FIELD};
use crate::model::identity::{assign_if_absent, new_identifier};
use crate::model::timestamp::{format_instant, TimestampPolicy};
use crate::model::validation::{required_text, validate_annotation, ValidationError};
use crate::model::AggregateKind;
use crate::store::{Document, DocumentStore, Filter};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

/// Repository interface for annotation CRUD and parent-scoped bulk access.
pub trait AnnotationRepository: Send + Sync {
    fn create(&self, draft: &AnnotationDraft) -> RepoResult<Annotation>;
    fn get_by_id(&self, id: &str) -> RepoResult<Option<Annotation>>;
    fn list_all(&self) -> RepoResult<Vec<Annotation>>;
    fn list_by_parent(&self, parent_id: &str) -> RepoResult<Vec<Annotation>>;
    fn update(&self, id: &str, draft: &AnnotationDraft) -> RepoResult<Annotation>;
    fn delete(&self, id: &str) -> RepoResult<Annotation>;
    fn delete_by_parent(&self, parent_id: &str) -> RepoResult<Vec<Annotation>>;
}

/// Annotation repository backed by any [`DocumentStore`].
pub struct DocumentAnnotationRepository<S: ?Sized> {
    store: Arc<S>,
    timestamps: TimestampPolicy,
}

impl<S: DocumentStore + ?Sized> DocumentAnnotationRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_timestamps(store, TimestampPolicy::default())
    }

    pub fn with_timestamps(store: Arc<S>, timestamps: TimestampPolicy) -> Self {
        Self { store, timestamps }
    }

    fn decode_all(&self, documents: Vec<Document>) -> RepoResult<Vec<Annotation>> {
        documents
            .into_iter()
            .map(|document| decode(document, ANNOTATIONS_COLLECTION))
            .collect()
    }
}

impl<S: DocumentStore + ?Sized> AnnotationRepository for DocumentAnnotationRepository<S> {
    fn create(&self, draft: &AnnotationDraft) -> RepoResult<Annotation> {
        let fields = validate_annotation(draft)?;
        let id = assign_if_absent(draft.clone())
            .id
            .unwrap_or_else(new_identifier);
        let annotation = Annotation::from_parts(id, fields, self.timestamps.stamp_create());

        self.store.insert(
            ANNOTATIONS_COLLECTION,
            encode(&annotation, ANNOTATIONS_COLLECTION)?,
        )?;
        debug!(
            "event=annotation_insert module=repo status=ok annotation_id={} parent_id={}",
            annotation.id, annotation.parent_id
        );
        Ok(annotation)
    }

    fn get_by_id(&self, id: &str) -> RepoResult<Option<Annotation>> {
        self.store
            .find_one(ANNOTATIONS_COLLECTION, &Filter::id(id))?
            .map(|document| decode(document, ANNOTATIONS_COLLECTION))
            .transpose()
    }

    fn list_all(&self) -> RepoResult<Vec<Annotation>> {
        let documents = self.store.find(ANNOTATIONS_COLLECTION, &Filter::All)?;
        self.decode_all(documents)
    }

    fn list_by_parent(&self, parent_id: &str) -> RepoResult<Vec<Annotation>> {
        let documents = self.store.find(
            ANNOTATIONS_COLLECTION,
            &Filter::field_eq(PARENT_FIELD, parent_id),
        )?;
        self.decode_all(documents)
    }

    fn update(&self, id: &str, draft: &AnnotationDraft) -> RepoResult<Annotation> {
        let author = required_text("author", draft.author.as_deref())?;
        let content = required_text("content", draft.content.as_deref())?;
        let existing = self
            .get_by_id(id)?
            .ok_or_else(|| not_found(AggregateKind::Annotation, id))?;
        if let Some(requested) = draft.parent_id.as_deref() {
            if requested != existing.parent_id {
                return Err(ValidationError::Reparent {
                    annotation_id: existing.id,
                    stored_parent: existing.parent_id,
                    requested_parent: requested.to_string(),
                }
                .into());
            }
        }
        let stamp = self.timestamps.stamp_update(&existing);

        let mut patch = Document::new();
        patch.insert("author".to_string(), Value::String(author));
        patch.insert("content".to_string(), Value::String(content));
        patch.insert(
            "updatedAt".to_string(),
            Value::String(format_instant(&stamp.updated_at)),
        );

        if self
            .store
            .update_one(ANNOTATIONS_COLLECTION, &Filter::id(id), &patch)?
            == 0
        {
            return Err(not_found(AggregateKind::Annotation, id));
        }
        debug!("event=annotation_update module=repo status=ok annotation_id={id}");

        self.get_by_id(id)?
            .ok_or_else(|| not_found(AggregateKind::Annotation, id))
    }

    fn delete(&self, id: &str) -> RepoResult<Annotation> {
        let existing = self
            .get_by_id(id)?
            .ok_or_else(|| not_found(AggregateKind::Annotation, id))?;
        if self
            .store
            .delete_one(ANNOTATIONS_COLLECTION, &Filter::id(id))?
            == 0
        {
            return Err(not_found(AggregateKind::Annotation, id));
        }
        debug!("event=annotation_delete module=repo status=ok annotation_id={id}");
        Ok(existing)
    }

    fn delete_by_parent(&self, parent_id: &str) -> RepoResult<Vec<Annotation>> {
        let filter = Filter::field_eq(PARENT_FIELD, parent_id);
        let removed = self.decode_all(self.store.find(ANNOTATIONS_COLLECTION, &filter)?)?;
        let count = self.store.delete_many(ANNOTATIONS_COLLECTION, &filter)?;
        debug!(
            "event=annotation_delete_by_parent module=repo status=ok parent_id={parent_id} matched={} removed={count}",
            removed.len()
        );
        Ok(removed)
    }
}
