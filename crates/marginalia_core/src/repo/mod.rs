//! Repositories over the two document collections.
//!
//! # Responsibility
//! - Own CRUD correctness for one collection each.
//! - Apply identity assignment, timestamp stamping and validation on writes.
//!
//! # Invariants
//! - Repositories never call each other; cross-collection rules live in the
//!   coordinator.
//! - Invalid input is rejected before any store call.
//! - Store failures are returned as-is and never reported as "not found".

use crate::model::validation::ValidationError;
use crate::model::{AggregateKind, DocumentId};
use crate::store::{Document, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod annotation_repo;
pub mod entry_repo;

/// Collection holding entry documents.
pub const ENTRIES_COLLECTION: &str = "entries";
/// Collection holding annotation documents.
pub const ANNOTATIONS_COLLECTION: &str = "annotations";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    NotFound { kind: AggregateKind, id: DocumentId },
    Store(StoreError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateId { id, .. } => {
                Self::Validation(ValidationError::IdentifierTaken(id))
            }
            other => Self::Store(other),
        }
    }
}

pub(crate) fn not_found(kind: AggregateKind, id: &str) -> RepoError {
    RepoError::NotFound {
        kind,
        id: id.to_string(),
    }
}

/// Serializes an aggregate into its persisted document form.
pub(crate) fn encode<T: Serialize>(value: &T, collection: &str) -> RepoResult<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(RepoError::InvalidData(format!(
            "{collection} aggregate did not encode to an object: {other}"
        ))),
        Err(err) => Err(RepoError::InvalidData(format!(
            "{collection} aggregate could not be encoded: {err}"
        ))),
    }
}

/// Decodes a stored document, rejecting malformed state instead of masking it.
pub(crate) fn decode<T: DeserializeOwned>(document: Document, collection: &str) -> RepoResult<T> {
    let id = document
        .get(crate::store::ID_FIELD)
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();
    serde_json::from_value(Value::Object(document)).map_err(|err| {
        RepoError::InvalidData(format!("malformed document `{id}` in {collection}: {err}"))
    })
}
