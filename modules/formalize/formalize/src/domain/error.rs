use formalize_sdk::{BlobStoreError, FormalizeError, GrantStoreError};
use thiserror::Error;

use crate::domain::authz::AuthorizationError;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: String },

    /// The requested action is not in the set granted to the current user.
    #[error("Access denied")]
    Forbidden,

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The grant store failed. Access could not be determined.
    #[error("Grant store error: {0}")]
    GrantStore(#[from] GrantStoreError),

    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobStoreError),

    /// Programming-contract violation (inconsistent authorization setup).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// `Ok(())` if `granted`, otherwise [`DomainError::Forbidden`].
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Forbidden`] when `granted` is `false`.
    pub fn ensure_granted(granted: bool) -> Result<(), Self> {
        if granted { Ok(()) } else { Err(Self::Forbidden) }
    }
}

impl From<AuthorizationError> for DomainError {
    fn from(e: AuthorizationError) -> Self {
        match e {
            AuthorizationError::Infrastructure(e) => Self::GrantStore(e),
            AuthorizationError::InvalidConfiguration(msg) => {
                tracing::error!(error = %msg, "authorization setup is inconsistent");
                Self::InvalidConfiguration(msg)
            }
        }
    }
}

/// Convert domain errors to SDK errors for public API consumption.
impl From<DomainError> for FormalizeError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { entity_type, id } => Self::not_found(entity_type, id),
            DomainError::BlobStore(BlobStoreError::NotFound(id)) => Self::not_found("file", id),
            DomainError::Forbidden => Self::forbidden(),
            DomainError::Validation { field, message } => {
                Self::validation(format!("{field}: {message}"))
            }
            DomainError::Conflict(message) => Self::conflict(message),
            DomainError::GrantStore(e) => Self::service_unavailable(e.to_string()),
            DomainError::BlobStore(e) => Self::service_unavailable(e.to_string()),
            DomainError::InvalidConfiguration(_) | DomainError::Storage(_) => Self::internal(),
        }
    }
}
