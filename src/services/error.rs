//! Errors shared by the collection services

use crate::access::{Collection, Operation, Where};
use crate::models::User;

/// Error types for collection operations
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The operation needs a logged-in user
    #[error("Authentication required")]
    Unauthorized,

    /// The requester may not perform the operation at all
    #[error("You are not allowed to {operation} {collection}")]
    Forbidden {
        collection: Collection,
        operation: &'static str,
    },

    /// No record with that id, or none visible to the requester
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Invalid input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Unique field already taken
    #[error("{0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Resolve the access filter for an operation, failing when access is denied.
///
/// A denied anonymous request is `Unauthorized`; a denied authenticated one
/// is `Forbidden`.
pub fn authorize(
    collection: Collection,
    operation: Operation,
    user: Option<&User>,
) -> Result<Where, ContentError> {
    collection
        .access(operation, user)
        .filter()
        .ok_or_else(|| match user {
            None => ContentError::Unauthorized,
            Some(_) => ContentError::Forbidden {
                collection,
                operation: match operation {
                    Operation::Read => "read",
                    Operation::Create => "create",
                    Operation::Update => "update",
                    Operation::Delete => "delete",
                },
            },
        })
}

/// Reject blank required text fields
pub fn require_text(field: &str, value: &str) -> Result<(), ContentError> {
    if value.trim().is_empty() {
        return Err(ContentError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}
