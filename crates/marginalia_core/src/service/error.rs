//! Caller-facing error taxonomy.
//!
//! # Invariants
//! - `Invalid` and `ParentNotFound` are caller errors and are never retried.
//! - Store failures stay `StoreFault`; they are never coerced to `NotFound`.

use crate::model::validation::ValidationError;
use crate::model::{AggregateKind, DocumentId, EntryId};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Error returned by every coordinator operation.
#[derive(Debug)]
pub enum CoreError {
    /// Payload failed validation; nothing was written.
    Invalid(ValidationError),
    /// Target identifier does not resolve.
    NotFound { kind: AggregateKind, id: DocumentId },
    /// Referenced parent entry is absent or already deleted.
    ParentNotFound(EntryId),
    /// Underlying store call failed, or stored data is corrupt.
    StoreFault(RepoError),
}

/// Discriminant of [`CoreError`] for routing and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreErrorKind {
    Invalid,
    NotFound,
    ParentNotFound,
    StoreFault,
}

impl CoreErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::NotFound => "not_found",
            Self::ParentNotFound => "parent_not_found",
            Self::StoreFault => "store_fault",
        }
    }

    /// HTTP status the routing layer answers with.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Invalid => 400,
            Self::NotFound | Self::ParentNotFound => 404,
            Self::StoreFault => 500,
        }
    }
}

impl CoreError {
    pub fn kind(&self) -> CoreErrorKind {
        match self {
            Self::Invalid(_) => CoreErrorKind::Invalid,
            Self::NotFound { .. } => CoreErrorKind::NotFound,
            Self::ParentNotFound(_) => CoreErrorKind::ParentNotFound,
            Self::StoreFault(_) => CoreErrorKind::StoreFault,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub(crate) fn not_found(kind: AggregateKind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "invalid input: {err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent entry not found: {id}"),
            Self::StoreFault(err) => write!(f, "store fault: {err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::StoreFault(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::ParentNotFound(_) => None,
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value)
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Invalid(err),
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::StoreFault(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreError, CoreErrorKind};
    use crate::model::validation::ValidationError;
    use crate::model::AggregateKind;
    use crate::repo::RepoError;
    use crate::store::StoreError;

    #[test]
    fn repo_errors_map_to_taxonomy() {
        let invalid: CoreError = RepoError::Validation(ValidationError::MissingField("title")).into();
        assert_eq!(invalid.kind(), CoreErrorKind::Invalid);

        let missing: CoreError = RepoError::NotFound {
            kind: AggregateKind::Entry,
            id: "e-1".to_string(),
        }
        .into();
        assert_eq!(missing.kind(), CoreErrorKind::NotFound);
        assert_eq!(missing.to_string(), "entry not found: e-1");

        let fault: CoreError = RepoError::Store(StoreError::Poisoned("test")).into();
        assert_eq!(fault.kind(), CoreErrorKind::StoreFault);

        let corrupt: CoreError = RepoError::InvalidData("bad".to_string()).into();
        assert_eq!(corrupt.kind(), CoreErrorKind::StoreFault);
    }

    #[test]
    fn kinds_map_to_transport_status() {
        assert_eq!(CoreErrorKind::Invalid.status_code(), 400);
        assert_eq!(CoreErrorKind::NotFound.status_code(), 404);
        assert_eq!(CoreErrorKind::ParentNotFound.status_code(), 404);
        assert_eq!(CoreErrorKind::StoreFault.status_code(), 500);
        assert_eq!(
            CoreError::ParentNotFound("x".to_string()).status_code(),
            404
        );
    }
}
