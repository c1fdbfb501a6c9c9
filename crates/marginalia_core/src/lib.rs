//! Consistency and identity core for entries and their annotations.
//!
//! The backing document store has no foreign keys, no cascades and no
//! cross-collection transactions, so this crate enforces those rules itself:
//! identity assignment, timestamp stamping, parent-existence checks and
//! cascading deletes.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use model::annotation::{Annotation, AnnotationDraft};
pub use model::entry::{Entry, EntryDraft};
pub use model::validation::ValidationError;
pub use model::{AggregateKind, AnnotationId, DocumentId, EntryId};
pub use repo::annotation_repo::{AnnotationRepository, DocumentAnnotationRepository};
pub use repo::entry_repo::{DocumentEntryRepository, EntryRepository};
pub use repo::{RepoError, RepoResult};
pub use service::coordinator::{Coordinator, DocumentCoordinator, EntryDeletion};
pub use service::dispatch::{Operation, Outcome, Reply};
pub use service::error::{CoreError, CoreErrorKind, CoreResult};
pub use store::{
    Document, DocumentStore, Filter, MemoryDocumentStore, SqliteDocumentStore, StoreError,
    StoreResult,
};

/// Minimal health check.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
