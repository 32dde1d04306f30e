//! API for the external blob store holding the bytes of submitted files.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::FileMetadata;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlobStoreError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("blob store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Client for the blob store. Only metadata lookup and removal are needed here;
/// uploads happen before a submission is created.
#[async_trait]
pub trait BlobFileClient: Send + Sync {
    /// Display metadata of a stored file.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no blob has this identifier
    /// - `Unavailable` if the store cannot be reached
    async fn file_metadata(
        &self,
        file_data_identifier: &str,
    ) -> Result<FileMetadata, BlobStoreError>;

    /// Remove a stored file.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the store cannot be reached
    async fn remove_file(&self, file_data_identifier: &str) -> Result<(), BlobStoreError>;
}
