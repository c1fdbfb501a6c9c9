//! Identity assignment for new aggregates.
//!
//! # Responsibility
//! - Generate collision-resistant identifiers (UUID v4, 122 random bits).
//! - Leave caller-supplied identifiers untouched.
//!
//! # Invariants
//! - `assign_if_absent` never replaces a present identifier.
//! - A blank identifier is treated as absent.

use super::DocumentId;
use uuid::Uuid;

/// Aggregate drafts that may or may not already carry an identifier.
pub trait Identified: Sized {
    /// Returns the carried identifier, if any.
    fn identifier(&self) -> Option<&str>;
    /// Returns a copy carrying `id`.
    fn with_identifier(self, id: DocumentId) -> Self;
}

/// Generates a new random identifier in hyphenated lowercase form.
pub fn new_identifier() -> DocumentId {
    Uuid::new_v4().to_string()
}

/// Returns whether `aggregate` already carries a usable identifier.
pub fn has_identifier<T: Identified>(aggregate: &T) -> bool {
    aggregate
        .identifier()
        .is_some_and(|id| !id.trim().is_empty())
}

/// Returns `aggregate` unchanged when it carries an identifier, otherwise a
/// copy with a freshly generated one.
pub fn assign_if_absent<T: Identified>(aggregate: T) -> T {
    if has_identifier(&aggregate) {
        aggregate
    } else {
        aggregate.with_identifier(new_identifier())
    }
}
