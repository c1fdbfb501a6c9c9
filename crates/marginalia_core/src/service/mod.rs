//! Use-case layer facing the routing collaborator.
//!
//! # Responsibility
//! - Own the cross-collection invariant: an annotation exists only while its
//!   parent entry exists.
//! - Translate repository failures into the caller-facing error taxonomy.
//! - Offer one typed dispatch entry point per routed operation.

pub mod coordinator;
pub mod dispatch;
pub mod error;
