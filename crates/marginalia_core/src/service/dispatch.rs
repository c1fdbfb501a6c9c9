//! Typed dispatch surface for the routing layer.
//!
//! The router resolves verb + path + body into an [`Operation`]; the reply
//! carries the aggregate(s) to serialize and whether the call created one.

use super::coordinator::{Coordinator, EntryDeletion};
use super::error::{CoreError, CoreResult};
use crate::model::annotation::{Annotation, AnnotationDraft};
use crate::model::entry::{Entry, EntryDraft};
use crate::model::{AggregateKind, AnnotationId, EntryId};
use crate::repo::annotation_repo::AnnotationRepository;
use crate::repo::entry_repo::EntryRepository;
use log::debug;
use serde::Serialize;

/// One routed call, already resolved to aggregate type and target id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateEntry(EntryDraft),
    GetEntry(EntryId),
    ListEntries,
    UpdateEntry {
        id: EntryId,
        draft: EntryDraft,
    },
    DeleteEntry(EntryId),
    CreateAnnotation {
        parent_id: EntryId,
        draft: AnnotationDraft,
    },
    GetAnnotation {
        parent_id: EntryId,
        id: AnnotationId,
    },
    ListAnnotations {
        parent_id: EntryId,
    },
    ListAllAnnotations,
    UpdateAnnotation {
        parent_id: EntryId,
        id: AnnotationId,
        draft: AnnotationDraft,
    },
    DeleteAnnotation {
        parent_id: EntryId,
        id: AnnotationId,
    },
    DeleteAnnotations {
        parent_id: EntryId,
    },
}

impl Operation {
    /// Stable operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateEntry(_) => "create_entry",
            Self::GetEntry(_) => "get_entry",
            Self::ListEntries => "list_entries",
            Self::UpdateEntry { .. } => "update_entry",
            Self::DeleteEntry(_) => "delete_entry",
            Self::CreateAnnotation { .. } => "create_annotation",
            Self::GetAnnotation { .. } => "get_annotation",
            Self::ListAnnotations { .. } => "list_annotations",
            Self::ListAllAnnotations => "list_all_annotations",
            Self::UpdateAnnotation { .. } => "update_annotation",
            Self::DeleteAnnotation { .. } => "delete_annotation",
            Self::DeleteAnnotations { .. } => "delete_annotations",
        }
    }

    /// Aggregate type the operation primarily targets.
    pub fn target(&self) -> AggregateKind {
        match self {
            Self::CreateEntry(_)
            | Self::GetEntry(_)
            | Self::ListEntries
            | Self::UpdateEntry { .. }
            | Self::DeleteEntry(_) => AggregateKind::Entry,
            _ => AggregateKind::Annotation,
        }
    }
}

/// Payload of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Entry(Entry),
    Entries(Vec<Entry>),
    EntryDeletion(EntryDeletion),
    Annotation(Annotation),
    Annotations(Vec<Annotation>),
}

/// Successful reply handed back to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub created: bool,
    pub outcome: Outcome,
}

impl Reply {
    fn ok(outcome: Outcome) -> Self {
        Self {
            created: false,
            outcome,
        }
    }

    fn created(outcome: Outcome) -> Self {
        Self {
            created: true,
            outcome,
        }
    }

    /// HTTP status for this reply: 201 for creates, 200 otherwise.
    pub fn status_code(&self) -> u16 {
        if self.created {
            201
        } else {
            200
        }
    }
}

impl<E: EntryRepository, A: AnnotationRepository> Coordinator<E, A> {
    /// Executes one routed operation.
    pub fn dispatch(&self, operation: Operation) -> CoreResult<Reply> {
        let name = operation.name();
        let reply = match operation {
            Operation::CreateEntry(draft) => {
                Reply::created(Outcome::Entry(self.create_entry(&draft)?))
            }
            Operation::GetEntry(id) => match self.get_entry(&id)? {
                Some(entry) => Reply::ok(Outcome::Entry(entry)),
                None => return Err(CoreError::not_found(AggregateKind::Entry, &id)),
            },
            Operation::ListEntries => Reply::ok(Outcome::Entries(self.list_entries()?)),
            Operation::UpdateEntry { id, draft } => {
                Reply::ok(Outcome::Entry(self.update_entry(&id, &draft)?))
            }
            Operation::DeleteEntry(id) => {
                Reply::ok(Outcome::EntryDeletion(self.delete_entry(&id)?))
            }
            Operation::CreateAnnotation { parent_id, draft } => Reply::created(
                Outcome::Annotation(self.create_annotation(&parent_id, &draft)?),
            ),
            Operation::GetAnnotation { parent_id, id } => {
                Reply::ok(Outcome::Annotation(self.get_annotation(&parent_id, &id)?))
            }
            Operation::ListAnnotations { parent_id } => {
                Reply::ok(Outcome::Annotations(self.list_annotations(&parent_id)?))
            }
            Operation::ListAllAnnotations => {
                Reply::ok(Outcome::Annotations(self.list_all_annotations()?))
            }
            Operation::UpdateAnnotation {
                parent_id,
                id,
                draft,
            } => Reply::ok(Outcome::Annotation(
                self.update_annotation(&id, &parent_id, &draft)?,
            )),
            Operation::DeleteAnnotation { parent_id, id } => {
                Reply::ok(Outcome::Annotation(self.delete_annotation(&parent_id, &id)?))
            }
            Operation::DeleteAnnotations { parent_id } => {
                Reply::ok(Outcome::Annotations(self.delete_annotations(&parent_id)?))
            }
        };
        debug!(
            "event=dispatch module=service status=ok operation={name} status_code={}",
            reply.status_code()
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::{Operation, Outcome};
    use crate::model::annotation::AnnotationDraft;
    use crate::model::entry::EntryDraft;
    use crate::model::AggregateKind;
    use crate::service::coordinator::Coordinator;
    use crate::service::error::CoreErrorKind;
    use crate::store::MemoryDocumentStore;
    use std::sync::Arc;

    #[test]
    fn create_replies_with_201_and_reads_with_200() {
        let coordinator = Coordinator::over_store(Arc::new(MemoryDocumentStore::new()));
        let created = coordinator
            .dispatch(Operation::CreateEntry(EntryDraft::new("T", "C")))
            .unwrap();
        assert_eq!(created.status_code(), 201);
        let Outcome::Entry(entry) = created.outcome else {
            panic!("expected entry outcome");
        };

        let fetched = coordinator
            .dispatch(Operation::GetEntry(entry.id.clone()))
            .unwrap();
        assert_eq!(fetched.status_code(), 200);
        assert_eq!(fetched.outcome, Outcome::Entry(entry));
    }

    #[test]
    fn missing_targets_map_to_404() {
        let coordinator = Coordinator::over_store(Arc::new(MemoryDocumentStore::new()));
        let err = coordinator
            .dispatch(Operation::GetEntry("nope".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
        assert_eq!(err.status_code(), 404);

        let op = Operation::CreateAnnotation {
            parent_id: "nope".to_string(),
            draft: AnnotationDraft::unbound("A", "X"),
        };
        assert_eq!(op.target(), AggregateKind::Annotation);
        let err = coordinator.dispatch(op).unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::ParentNotFound);
    }

    #[test]
    fn outcomes_serialize_as_bare_documents() {
        let coordinator = Coordinator::over_store(Arc::new(MemoryDocumentStore::new()));
        let reply = coordinator
            .dispatch(Operation::CreateEntry(EntryDraft::new("T", "C")))
            .unwrap();
        let value = serde_json::to_value(&reply.outcome).unwrap();
        assert_eq!(value["title"], "T");
        assert!(value["_id"].is_string());

        let listed = coordinator.dispatch(Operation::ListEntries).unwrap();
        let value = serde_json::to_value(&listed.outcome).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(1));
    }
}
