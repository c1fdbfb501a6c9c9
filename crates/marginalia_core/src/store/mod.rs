//! Document store abstraction.
//!
//! # Responsibility
//! - Define the minimal primitives the repositories rely on: find, insert,
//!   update-one, delete-one and delete-many over equality filters.
//! - Provide in-memory and SQLite-backed implementations.
//!
//! # Invariants
//! - A single primitive call is atomic for the documents it touches.
//! - No primitive spans collections; callers own cross-collection ordering.
//! - `_id` is unique per collection and never rewritten by `update_one`.
//! - `find` returns documents in insertion order.

use crate::db::DbError;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

/// Identifier field present in every document.
pub const ID_FIELD: &str = "_id";

/// Schema-less document body.
pub type Document = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by a document store backend.
#[derive(Debug)]
pub enum StoreError {
    /// SQLite or bootstrap failure.
    Db(DbError),
    /// Stored body could not be encoded or decoded.
    Serialization(serde_json::Error),
    /// A lock guarding backend state was poisoned by a panicking writer.
    Poisoned(&'static str),
    /// Insert collided with an existing `_id`.
    DuplicateId { collection: String, id: String },
    /// Document or filter cannot be handled by the backend.
    InvalidDocument(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
            Self::Poisoned(context) => write!(f, "poisoned lock: {context}"),
            Self::DuplicateId { collection, id } => {
                write!(f, "duplicate _id `{id}` in collection `{collection}`")
            }
            Self::InvalidDocument(message) => write!(f, "invalid document: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Poisoned(_) => None,
            Self::DuplicateId { .. } => None,
            Self::InvalidDocument(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Equality filter over one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document in the collection.
    All,
    /// Matches documents whose `field` equals `value`.
    Eq { field: String, value: Value },
}

impl Filter {
    /// Matches the document with the given `_id`.
    pub fn id(id: &str) -> Self {
        Self::field_eq(ID_FIELD, id)
    }

    pub fn field_eq(field: &str, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Evaluates the filter against an in-memory document.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => document.get(field) == Some(value),
        }
    }
}

/// Primitive operations of a schema-less document store.
///
/// Implementations are shared across worker threads.
pub trait DocumentStore: Send + Sync {
    /// Returns every matching document in insertion order.
    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Returns the first matching document.
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        Ok(self.find(collection, filter)?.into_iter().next())
    }

    /// Inserts one document. It must carry a string `_id` unique in `collection`.
    fn insert(&self, collection: &str, document: Document) -> StoreResult<()>;

    /// Replaces the fields listed in `patch` on the first matching document.
    ///
    /// Returns the number of matched documents (0 or 1).
    fn update_one(&self, collection: &str, filter: &Filter, patch: &Document) -> StoreResult<u64>;

    /// Removes the first matching document. Returns the removed count.
    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Removes every matching document. Returns the removed count.
    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;
}

/// Extracts the string `_id` of a document about to be inserted.
pub(crate) fn document_id(document: &Document) -> StoreResult<String> {
    match document.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(other) => Err(StoreError::InvalidDocument(format!(
            "`{ID_FIELD}` must be a non-empty string, got {other}"
        ))),
        None => Err(StoreError::InvalidDocument(format!(
            "document has no `{ID_FIELD}` field"
        ))),
    }
}

/// Applies `$set`-style replacement of top-level fields.
pub(crate) fn apply_patch(document: &mut Document, patch: &Document) -> StoreResult<()> {
    if patch.contains_key(ID_FIELD) {
        return Err(StoreError::InvalidDocument(format!(
            "patch must not rewrite `{ID_FIELD}`"
        )));
    }
    for (field, value) in patch {
        document.insert(field.clone(), value.clone());
    }
    Ok(())
}
