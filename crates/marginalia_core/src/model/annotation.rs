//! Annotation aggregate: the dependent side of the relation.
//!
//! # Invariants
//! - `parent_id` resolves to an existing entry when the annotation is created
//!   or updated, and never changes afterwards.

use super::identity::Identified;
use super::timestamp::{rfc3339_micros, Stamp, Timestamped};
use super::validation::AnnotationFields;
use super::{AnnotationId, DocumentId, EntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted field holding the parent reference.
pub const PARENT_FIELD: &str = "parentId";

/// Persisted annotation document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(rename = "_id")]
    pub id: AnnotationId,
    pub parent_id: EntryId,
    pub author: String,
    pub content: String,
    #[serde(with = "rfc3339_micros")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "rfc3339_micros")]
    pub updated_at: DateTime<Utc>,
}

impl Annotation {
    pub fn from_parts(id: AnnotationId, fields: AnnotationFields, stamp: Stamp) -> Self {
        Self {
            id,
            parent_id: fields.parent_id,
            author: fields.author,
            content: fields.content,
            created_at: stamp.created_at,
            updated_at: stamp.updated_at,
        }
    }
}

impl Timestamped for Annotation {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Inbound annotation payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDraft {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AnnotationId>,
    #[serde(default)]
    pub parent_id: Option<EntryId>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl AnnotationDraft {
    pub fn new(
        parent_id: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            parent_id: Some(parent_id.into()),
            author: Some(author.into()),
            content: Some(content.into()),
        }
    }

    /// Draft without a parent reference; the target entry supplies it.
    pub fn unbound(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

impl Identified for AnnotationDraft {
    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn with_identifier(self, id: DocumentId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AnnotationDraft, PARENT_FIELD};

    #[test]
    fn draft_reads_camel_case_parent_reference() {
        let draft: AnnotationDraft =
            serde_json::from_str(r#"{"parentId":"e-1","author":"A","content":"X"}"#).unwrap();
        assert_eq!(draft, AnnotationDraft::new("e-1", "A", "X"));

        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get(PARENT_FIELD).is_some());
        assert!(value.get("_id").is_none());
    }
}
