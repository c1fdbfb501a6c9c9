//! Entry aggregate: the parent side of the relation.
//!
//! # Invariants
//! - `id` and `created_at` never change after the first persistence.
//! - Deleting an entry deletes every annotation whose `parent_id` equals `id`.

use super::identity::Identified;
use super::timestamp::{rfc3339_micros, Stamp, Timestamped};
use super::validation::EntryFields;
use super::{DocumentId, EntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted entry document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(rename = "_id")]
    pub id: EntryId,
    pub title: String,
    pub content: String,
    #[serde(with = "rfc3339_micros")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "rfc3339_micros")]
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Assembles a stamped entry from validated fields.
    pub fn from_parts(id: EntryId, fields: EntryFields, stamp: Stamp) -> Self {
        Self {
            id,
            title: fields.title,
            content: fields.content,
            created_at: stamp.created_at,
            updated_at: stamp.updated_at,
        }
    }
}

impl Timestamped for Entry {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Inbound entry payload as deserialized by the transport.
///
/// Timestamps sent by callers are ignored; the policy owns them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl EntryDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: Some(title.into()),
            content: Some(content.into()),
        }
    }
}

impl Identified for EntryDraft {
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
