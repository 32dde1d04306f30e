//! Plugin API for the resource grant store.
//!
//! The grant store persists explicit `(resource, action, subject)` grants.
//! It is an external collaborator: the formalize module only talks to it
//! through [`ResourceGrantClient`]. Resource classes and action names cross
//! this boundary as plain strings.

use async_trait::async_trait;
use formalize_security::SecurityContext;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Infrastructure failures of the grant store.
///
/// None of these mean "access denied": callers must surface them as
/// "cannot determine access".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrantStoreError {
    /// The store could not be reached.
    #[error("grant store unavailable: {0}")]
    Unavailable(String),

    /// Grants were added to a resource that was never registered.
    #[error("resource {resource_class}/{} is not registered", resource_identifier.as_deref().unwrap_or("*"))]
    ResourceNotRegistered {
        resource_class: String,
        resource_identifier: Option<String>,
    },

    /// The resource has already been registered.
    #[error("resource {resource_class}/{} is already registered", resource_identifier.as_deref().unwrap_or("*"))]
    ResourceAlreadyRegistered {
        resource_class: String,
        resource_identifier: Option<String>,
    },

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Who a grant is issued to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum GrantSubject {
    /// A specific user.
    User(String),
    /// A static group.
    Group(String),
    /// A dynamic group, evaluated against user attributes at lookup time.
    DynamicGroup(String),
}

/// A resource registered with the grant store.
///
/// `resource_identifier == None` denotes the collection resource of the class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Store-assigned handle identifier.
    pub identifier: String,
    pub resource_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_identifier: Option<String>,
}

/// A grant as stored by the grant store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceActionGrant {
    pub identifier: String,
    pub resource: ResourceHandle,
    pub action: String,
    pub subject: GrantSubject,
}

/// Client for the external resource grant store.
///
/// Lookups are evaluated for the caller described by the `SecurityContext`
/// (user, static groups and dynamic groups). Implementations must not
/// retry internally and must not translate failures into "no grant".
#[async_trait]
pub trait ResourceGrantClient: Send + Sync {
    /// Whether the current user holds at least one of `actions` on the resource.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the store cannot be reached
    /// - `Internal` for unexpected errors
    async fn is_current_user_granted_any_of(
        &self,
        ctx: &SecurityContext,
        resource_class: &str,
        resource_identifier: Option<&str>,
        actions: &[&str],
    ) -> Result<bool, GrantStoreError>;

    /// All action names granted to the current user on the resource.
    ///
    /// Returns an empty list (not an error) for unknown resources.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the store cannot be reached
    /// - `Internal` for unexpected errors
    async fn get_granted_actions(
        &self,
        ctx: &SecurityContext,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<Vec<String>, GrantStoreError>;

    /// Look up an already registered resource.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the store cannot be reached
    async fn find_resource(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<Option<ResourceHandle>, GrantStoreError>;

    /// Register a resource so that grants can be attached to it.
    ///
    /// # Errors
    ///
    /// - `ResourceAlreadyRegistered` if the resource exists
    /// - `Unavailable` if the store cannot be reached
    async fn register_resource(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<ResourceHandle, GrantStoreError>;

    /// Grant `action` on `resource` to `subject`.
    ///
    /// # Errors
    ///
    /// - `ResourceNotRegistered` if the handle does not name a registered resource
    /// - `Unavailable` if the store cannot be reached
    async fn add_grant(
        &self,
        resource: &ResourceHandle,
        action: &str,
        subject: &GrantSubject,
    ) -> Result<ResourceActionGrant, GrantStoreError>;

    /// Remove the resource and all of its grants. Unknown resources are a no-op.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the store cannot be reached
    async fn remove_all_grants_for_resource(
        &self,
        resource_class: &str,
        resource_identifier: &str,
    ) -> Result<(), GrantStoreError>;

    /// Bulk variant of [`Self::remove_all_grants_for_resource`], applied in one pass.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the store cannot be reached
    async fn remove_all_grants_for_resources(
        &self,
        resource_class: &str,
        resource_identifiers: &[String],
    ) -> Result<(), GrantStoreError>;
}
