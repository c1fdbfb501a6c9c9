//! Validation rules applied before any store interaction.
//!
//! # Responsibility
//! - Reject drafts with missing or blank required fields.
//! - Reject annotation drafts whose parent reference disagrees with the
//!   targeted entry.
//!
//! # Invariants
//! - Validation is pure; it never touches the store.
//! - Accepted values are passed through verbatim (no trimming).

use super::annotation::AnnotationDraft;
use super::entry::EntryDraft;
use super::DocumentId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-side input errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field absent from the payload.
    MissingField(&'static str),
    /// Required field present but empty or whitespace-only.
    BlankField(&'static str),
    /// Payload `parentId` disagrees with the targeted entry.
    ParentMismatch { expected: DocumentId, found: DocumentId },
    /// Update would move an annotation to another entry.
    Reparent {
        annotation_id: DocumentId,
        stored_parent: DocumentId,
        requested_parent: DocumentId,
    },
    /// Caller-supplied identifier is already used in the collection.
    IdentifierTaken(DocumentId),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::BlankField(field) => write!(f, "field `{field}` must not be empty"),
            Self::ParentMismatch { expected, found } => write!(
                f,
                "parentId `{found}` does not match targeted entry `{expected}`"
            ),
            Self::Reparent {
                annotation_id,
                stored_parent,
                requested_parent,
            } => write!(
                f,
                "annotation {annotation_id} belongs to entry {stored_parent}; cannot move it to {requested_parent}"
            ),
            Self::IdentifierTaken(id) => write!(f, "identifier already in use: {id}"),
        }
    }
}

impl Error for ValidationError {}

/// Validated entry payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    pub title: String,
    pub content: String,
}

/// Validated annotation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationFields {
    pub parent_id: DocumentId,
    pub author: String,
    pub content: String,
}

/// Checks a required text field and returns an owned copy.
pub fn required_text(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    match value {
        None => Err(ValidationError::MissingField(field)),
        Some(text) if text.trim().is_empty() => Err(ValidationError::BlankField(field)),
        Some(text) => Ok(text.to_string()),
    }
}

/// Validates an entry draft for create or update.
pub fn validate_entry(draft: &EntryDraft) -> Result<EntryFields, ValidationError> {
    Ok(EntryFields {
        title: required_text("title", draft.title.as_deref())?,
        content: required_text("content", draft.content.as_deref())?,
    })
}

/// Validates an annotation draft; `parentId` is required.
pub fn validate_annotation(draft: &AnnotationDraft) -> Result<AnnotationFields, ValidationError> {
    Ok(AnnotationFields {
        parent_id: required_text("parentId", draft.parent_id.as_deref())?,
        author: required_text("author", draft.author.as_deref())?,
        content: required_text("content", draft.content.as_deref())?,
    })
}

/// Binds an annotation draft to `parent_id`.
///
/// A draft without `parentId` inherits `parent_id`; a draft naming another
/// entry is rejected.
pub fn bind_parent(
    draft: &AnnotationDraft,
    parent_id: &str,
) -> Result<AnnotationDraft, ValidationError> {
    match draft.parent_id.as_deref() {
        Some(found) if found != parent_id => Err(ValidationError::ParentMismatch {
            expected: parent_id.to_string(),
            found: found.to_string(),
        }),
        _ => Ok(AnnotationDraft {
            parent_id: Some(parent_id.to_string()),
            ..draft.clone()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{bind_parent, validate_annotation, validate_entry, ValidationError};
    use crate::model::annotation::AnnotationDraft;
    use crate::model::entry::EntryDraft;

    #[test]
    fn entry_requires_title_and_content() {
        let missing = EntryDraft {
            content: Some("body".to_string()),
            ..EntryDraft::default()
        };
        assert_eq!(
            validate_entry(&missing),
            Err(ValidationError::MissingField("title"))
        );

        let blank = EntryDraft::new("   ", "body");
        assert_eq!(validate_entry(&blank), Err(ValidationError::BlankField("title")));

        let empty_content = EntryDraft::new("T", "");
        assert_eq!(
            validate_entry(&empty_content),
            Err(ValidationError::BlankField("content"))
        );

        let fields = validate_entry(&EntryDraft::new("T", " C ")).unwrap();
        assert_eq!(fields.content, " C ");
    }

    #[test]
    fn annotation_requires_parent_author_and_content() {
        let draft = AnnotationDraft {
            author: Some("A".to_string()),
            content: Some("X".to_string()),
            ..AnnotationDraft::default()
        };
        assert_eq!(
            validate_annotation(&draft),
            Err(ValidationError::MissingField("parentId"))
        );

        let bound = bind_parent(&draft, "entry-1").unwrap();
        let fields = validate_annotation(&bound).unwrap();
        assert_eq!(fields.parent_id, "entry-1");
        assert_eq!(fields.author, "A");
    }

    #[test]
    fn bind_parent_rejects_conflicting_reference() {
        let draft = AnnotationDraft::new("entry-2", "A", "X");
        let err = bind_parent(&draft, "entry-1").unwrap_err();
        assert!(matches!(err, ValidationError::ParentMismatch { ref expected, ref found }
            if expected == "entry-1" && found == "entry-2"));
        assert!(bind_parent(&draft, "entry-2").is_ok());
    }
}
