//! Aggregate model for entries and their annotations.
//!
//! # Responsibility
//! - Define the persisted shape of both aggregates and their inbound drafts.
//! - Host the pure policies applied before persistence: identity assignment,
//!   timestamp stamping and field validation.
//!
//! # Invariants
//! - Every persisted aggregate carries exactly one opaque `_id`.
//! - `updatedAt >= createdAt` for every persisted aggregate.
//! - An annotation references exactly one entry through `parentId`.

use std::fmt::{Display, Formatter};

pub mod annotation;
pub mod entry;
pub mod identity;
pub mod timestamp;
pub mod validation;

/// Opaque document identifier shared by both collections.
pub type DocumentId = String;

/// Identifier of an [`entry::Entry`].
pub type EntryId = DocumentId;

/// Identifier of an [`annotation::Annotation`].
pub type AnnotationId = DocumentId;

/// Aggregate type an operation or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Entry,
    Annotation,
}

impl AggregateKind {
    /// Stable lowercase label used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Annotation => "annotation",
        }
    }
}

impl Display for AggregateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
