#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Formalize SDK
//!
//! This crate provides the public contract of the `formalize` module:
//!
//! - [`FormalizeClient`] - Public API trait for consumers
//! - [`Form`], [`Submission`], [`SubmittedFile`] - Data model
//! - [`FormAction`], [`SubmissionAction`] and the collection actions - Action vocabulary
//! - [`ResourceGrantClient`] - Plugin API for the external resource grant store
//! - [`BlobFileClient`] - API for the external blob store holding submitted files
//! - [`GrantEventListener`] - Observer for grants created on submissions
//! - [`FormalizeError`] - Public error type
//!
//! ## Usage
//!
//! ```ignore
//! use formalize_sdk::{FormalizeClient, NewSubmission};
//!
//! let submission = client
//!     .create_submission(&ctx, NewSubmission::new(form_id).data_feed_element(json))
//!     .await?;
//!
//! // actions the current user may perform, for the response
//! let actions = submission.granted_actions.unwrap_or_default();
//! ```

pub mod actions;
pub mod api;
pub mod blob_api;
pub mod error;
pub mod events;
pub mod models;
pub mod plugin_api;

// Re-export main types at crate root
pub use actions::{
    FormAction, FormCollectionAction, ResourceClass, SubmissionAction,
    SubmissionCollectionAction, UnknownActionError,
};
pub use api::FormalizeClient;
pub use blob_api::{BlobFileClient, BlobStoreError};
pub use error::FormalizeError;
pub use events::{GrantEventListener, SubmissionGrantAdded};
pub use models::{
    FileMetadata, Form, FormPatch, LocalizedName, NewForm, NewSubmission, NewSubmittedFile,
    Submission, SubmissionPatch, SubmissionState, SubmissionStates, SubmittedFile,
    SubmittedFileDetails, Tag, TagPermissions,
};
pub use plugin_api::{
    GrantStoreError, GrantSubject, ResourceActionGrant, ResourceGrantClient, ResourceHandle,
};
