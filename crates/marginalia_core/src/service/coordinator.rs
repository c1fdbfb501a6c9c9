//! Consistency coordinator over the entry and annotation repositories.
//!
//! # Responsibility
//! - Check parent existence before an annotation is created, updated, read,
//!   or deleted through its entry.
//! - Cascade annotation removal when an entry is deleted.
//!
//! # Invariants
//! - Validation runs before any store call.
//! - `delete_entry` removes annotations before the entry. A failure while
//!   removing annotations leaves the entry in place and surfaces the fault.
//! - The coordinator holds no state besides the two repositories.
//!
//! # Known window
//! The store offers no cross-collection transaction. Two compensations
//! narrow the orphan window: `create_annotation` re-reads the parent after
//! inserting, and `delete_entry` sweeps annotations again after removing
//! the entry. When the re-read itself faults, the inserted annotation is
//! removed before the fault is returned, so a failed create leaves nothing
//! behind unless the removal fails too (logged as `stage=rollback`). A crash
//! between the cascade and the entry removal still leaves an entry without
//! its annotations.

use super::error::{CoreError, CoreResult};
use crate::model::annotation::{Annotation, AnnotationDraft};
use crate::model::entry::{Entry, EntryDraft};
use crate::model::timestamp::TimestampPolicy;
use crate::model::validation::{bind_parent, validate_annotation, validate_entry, ValidationError};
use crate::model::AggregateKind;
use crate::repo::annotation_repo::{AnnotationRepository, DocumentAnnotationRepository};
use crate::repo::entry_repo::{DocumentEntryRepository, EntryRepository};
use crate::repo::RepoError;
use crate::store::DocumentStore;
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Result of a cascading entry delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDeletion {
    /// The removed entry.
    pub entry: Entry,
    /// Every annotation removed with it, including sweep stragglers.
    pub annotations: Vec<Annotation>,
}

/// Steps of the cascading delete, used to tag failures in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CascadeStage {
    Lookup,
    CascadeAnnotations,
    DeleteEntry,
}

impl CascadeStage {
    fn as_str(self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::CascadeAnnotations => "cascade_annotations",
            Self::DeleteEntry => "delete_entry",
        }
    }
}

/// Coordinator wired to the document-store repositories.
pub type DocumentCoordinator<S> =
    Coordinator<DocumentEntryRepository<S>, DocumentAnnotationRepository<S>>;

/// Orchestrates both repositories behind one caller-facing API.
pub struct Coordinator<E, A> {
    entries: E,
    annotations: A,
}

impl<S: DocumentStore + ?Sized> Coordinator<DocumentEntryRepository<S>, DocumentAnnotationRepository<S>> {
    /// Builds both repositories over one shared store handle.
    pub fn over_store(store: Arc<S>) -> Self {
        Self::over_store_with_timestamps(store, TimestampPolicy::default())
    }

    pub fn over_store_with_timestamps(store: Arc<S>, timestamps: TimestampPolicy) -> Self {
        Self::new(
            DocumentEntryRepository::with_timestamps(Arc::clone(&store), timestamps.clone()),
            DocumentAnnotationRepository::with_timestamps(store, timestamps),
        )
    }
}

impl<E: EntryRepository, A: AnnotationRepository> Coordinator<E, A> {
    pub fn new(entries: E, annotations: A) -> Self {
        Self {
            entries,
            annotations,
        }
    }

    pub fn create_entry(&self, draft: &EntryDraft) -> CoreResult<Entry> {
        validate_entry(draft)?;
        let entry = self.entries.create(draft)?;
        info!(
            "event=entry_create module=coordinator status=ok entry_id={}",
            entry.id
        );
        Ok(entry)
    }

    pub fn get_entry(&self, id: &str) -> CoreResult<Option<Entry>> {
        Ok(self.entries.get_by_id(id)?)
    }

    pub fn list_entries(&self) -> CoreResult<Vec<Entry>> {
        Ok(self.entries.list_all()?)
    }

    pub fn update_entry(&self, id: &str, draft: &EntryDraft) -> CoreResult<Entry> {
        validate_entry(draft)?;
        let entry = self.entries.update(id, draft)?;
        info!("event=entry_update module=coordinator status=ok entry_id={id}");
        Ok(entry)
    }

    /// Deletes an entry together with all of its annotations.
    ///
    /// Steps: look the entry up, delete its annotations, delete the entry,
    /// then sweep annotations inserted meanwhile. Only the sweep may fail
    /// without failing the call, since the entry is already gone by then.
    pub fn delete_entry(&self, id: &str) -> CoreResult<EntryDeletion> {
        let started_at = Instant::now();

        self.entries
            .get_by_id(id)
            .map_err(|err| cascade_failed(CascadeStage::Lookup, id, err))?
            .ok_or_else(|| CoreError::not_found(AggregateKind::Entry, id))?;

        let mut annotations = self
            .annotations
            .delete_by_parent(id)
            .map_err(|err| cascade_failed(CascadeStage::CascadeAnnotations, id, err))?;

        let entry = self
            .entries
            .delete(id)
            .map_err(|err| cascade_failed(CascadeStage::DeleteEntry, id, err))?;

        match self.annotations.delete_by_parent(id) {
            Ok(stragglers) if !stragglers.is_empty() => {
                warn!(
                    "event=entry_delete module=coordinator status=swept entry_id={id} stragglers={}",
                    stragglers.len()
                );
                annotations.extend(stragglers);
            }
            Ok(_) => {}
            Err(err) => warn!(
                "event=entry_delete module=coordinator status=degraded stage=sweep entry_id={id} error={err}"
            ),
        }

        info!(
            "event=entry_delete module=coordinator status=ok entry_id={id} annotations={} duration_ms={}",
            annotations.len(),
            started_at.elapsed().as_millis()
        );
        Ok(EntryDeletion { entry, annotations })
    }

    /// Creates an annotation under `parent_id`.
    pub fn create_annotation(
        &self,
        parent_id: &str,
        draft: &AnnotationDraft,
    ) -> CoreResult<Annotation> {
        let bound = bind_parent(draft, parent_id)?;
        validate_annotation(&bound)?;
        self.require_parent(parent_id)?;

        let annotation = self.annotations.create(&bound)?;

        match self.entries.get_by_id(parent_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                // Parent deleted between the check and the insert.
                self.roll_back_annotation(&annotation.id, parent_id, "parent_gone")?;
                return Err(CoreError::ParentNotFound(parent_id.to_string()));
            }
            Err(err) => {
                if let Err(rollback_err) =
                    self.roll_back_annotation(&annotation.id, parent_id, "recheck_failed")
                {
                    error!(
                        "event=annotation_create module=coordinator status=error stage=rollback annotation_id={} parent_id={parent_id} error={rollback_err}",
                        annotation.id
                    );
                }
                return Err(err.into());
            }
        }

        info!(
            "event=annotation_create module=coordinator status=ok annotation_id={} parent_id={parent_id}",
            annotation.id
        );
        Ok(annotation)
    }

    /// Replaces author/content of annotation `id` under `parent_id`.
    pub fn update_annotation(
        &self,
        id: &str,
        parent_id: &str,
        draft: &AnnotationDraft,
    ) -> CoreResult<Annotation> {
        let bound = bind_parent(draft, parent_id)?;
        validate_annotation(&bound)?;
        self.require_parent(parent_id)?;

        let existing = self
            .annotations
            .get_by_id(id)?
            .ok_or_else(|| CoreError::not_found(AggregateKind::Annotation, id))?;
        if existing.parent_id != parent_id {
            return Err(ValidationError::Reparent {
                annotation_id: existing.id,
                stored_parent: existing.parent_id,
                requested_parent: parent_id.to_string(),
            }
            .into());
        }

        let annotation = self.annotations.update(id, &bound)?;
        info!(
            "event=annotation_update module=coordinator status=ok annotation_id={id} parent_id={parent_id}"
        );
        Ok(annotation)
    }

    /// Reads one annotation through its entry.
    pub fn get_annotation(&self, parent_id: &str, id: &str) -> CoreResult<Annotation> {
        self.require_parent(parent_id)?;
        self.annotation_under(parent_id, id)
    }

    /// Lists the annotations of an existing entry.
    pub fn list_annotations(&self, parent_id: &str) -> CoreResult<Vec<Annotation>> {
        self.require_parent(parent_id)?;
        Ok(self.annotations.list_by_parent(parent_id)?)
    }

    /// Lists every annotation regardless of entry.
    pub fn list_all_annotations(&self) -> CoreResult<Vec<Annotation>> {
        Ok(self.annotations.list_all()?)
    }

    /// Deletes one annotation through its entry.
    pub fn delete_annotation(&self, parent_id: &str, id: &str) -> CoreResult<Annotation> {
        self.require_parent(parent_id)?;
        self.annotation_under(parent_id, id)?;
        let annotation = self.annotations.delete(id)?;
        info!(
            "event=annotation_delete module=coordinator status=ok annotation_id={id} parent_id={parent_id}"
        );
        Ok(annotation)
    }

    /// Deletes every annotation of an existing entry, keeping the entry.
    pub fn delete_annotations(&self, parent_id: &str) -> CoreResult<Vec<Annotation>> {
        self.require_parent(parent_id)?;
        let removed = self.annotations.delete_by_parent(parent_id)?;
        info!(
            "event=annotation_purge module=coordinator status=ok parent_id={parent_id} removed={}",
            removed.len()
        );
        Ok(removed)
    }

    fn roll_back_annotation(&self, id: &str, parent_id: &str, reason: &str) -> CoreResult<()> {
        match self.annotations.delete(id) {
            Ok(_) | Err(RepoError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }
        warn!(
            "event=annotation_create module=coordinator status=rolled_back reason={reason} annotation_id={id} parent_id={parent_id}"
        );
        Ok(())
    }

    fn require_parent(&self, parent_id: &str) -> CoreResult<Entry> {
        self.entries
            .get_by_id(parent_id)?
            .ok_or_else(|| CoreError::ParentNotFound(parent_id.to_string()))
    }

    fn annotation_under(&self, parent_id: &str, id: &str) -> CoreResult<Annotation> {
        match self.annotations.get_by_id(id)? {
            Some(annotation) if annotation.parent_id == parent_id => Ok(annotation),
            _ => Err(CoreError::not_found(AggregateKind::Annotation, id)),
        }
    }
}

fn cascade_failed(stage: CascadeStage, id: &str, err: RepoError) -> CoreError {
    error!(
        "event=entry_delete module=coordinator status=error stage={} entry_id={id} error={err}",
        stage.as_str()
    );
    err.into()
}

#[cfg(test)]
mod tests {
    use super::Coordinator;
    use crate::model::annotation::AnnotationDraft;
    use crate::model::entry::EntryDraft;
    use crate::service::error::CoreErrorKind;
    use crate::store::MemoryDocumentStore;
    use std::sync::Arc;

    #[test]
    fn invalid_annotation_is_rejected_before_parent_lookup() {
        let coordinator = Coordinator::over_store(Arc::new(MemoryDocumentStore::new()));
        let err = coordinator
            .create_annotation("no-such-entry", &AnnotationDraft::unbound("", "X"))
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Invalid);
    }

    #[test]
    fn annotation_reads_are_scoped_to_their_entry() {
        let coordinator = Coordinator::over_store(Arc::new(MemoryDocumentStore::new()));
        let first = coordinator.create_entry(&EntryDraft::new("one", "1")).unwrap();
        let second = coordinator.create_entry(&EntryDraft::new("two", "2")).unwrap();
        let note = coordinator
            .create_annotation(&first.id, &AnnotationDraft::unbound("A", "X"))
            .unwrap();

        assert_eq!(coordinator.get_annotation(&first.id, &note.id).unwrap(), note);
        let err = coordinator.get_annotation(&second.id, &note.id).unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
        let err = coordinator.delete_annotation(&second.id, &note.id).unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
        assert_eq!(coordinator.list_annotations(&first.id).unwrap(), vec![note]);
    }
}
