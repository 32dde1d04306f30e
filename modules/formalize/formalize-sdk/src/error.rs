//! Public error types for the `formalize` module.
//!
//! These errors are safe to expose to other modules and consumers.

use thiserror::Error;

/// Errors that can be returned by the [`FormalizeClient`](crate::FormalizeClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormalizeError {
    /// Resource with the specified identifier was not found.
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// The current user is not granted the requested action.
    #[error("Access denied")]
    Forbidden,

    /// Validation error with the provided data.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The request conflicts with the current state (e.g. submission limit reached).
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// A collaborator (grant store, blob store) could not be reached.
    /// Access could not be determined; this is not a denial.
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// An internal error occurred.
    #[error("Internal error")]
    Internal,
}

impl FormalizeError {
    pub fn not_found(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::Forbidden
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::Internal
    }
}
