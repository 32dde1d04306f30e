//! Form and submission lifecycle services.
//!
//! Each operation loads the resource, asks the policy engine whether the
//! current user may act on it, and only then persists. Grant resources are
//! created after the domain object is stored; if that fails the stored
//! object is removed again so neither side outlives the other.

mod forms;
mod submissions;

use std::sync::Arc;

use formalize_sdk::{BlobFileClient, Form, SubmittedFile};

use super::authz::AuthorizationService;
use super::error::DomainError;
use super::hooks::GrantLifecycleHooks;
use super::repo::{FormsRepository, SubmissionsRepository};

pub use forms::FormService;
pub use submissions::SubmissionService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Applied when a new form does not set its own limit. `0` means unlimited.
    pub default_max_num_submissions_per_creator: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_max_num_submissions_per_creator: 10,
        }
    }
}

/// Collaborators shared by the services.
pub struct Deps {
    pub authz: AuthorizationService,
    pub hooks: Arc<GrantLifecycleHooks>,
    pub forms: Arc<dyn FormsRepository>,
    pub submissions: Arc<dyn SubmissionsRepository>,
    pub blobs: Arc<dyn BlobFileClient>,
    pub config: ServiceConfig,
}

impl Deps {
    async fn load_form(&self, identifier: &str) -> Result<Form, DomainError> {
        self.forms
            .find(identifier)
            .await?
            .ok_or_else(|| DomainError::not_found("form", identifier))
    }

    /// Blob removal after the owning rows are gone. Failures leave orphaned
    /// blobs only, so they are logged and not returned.
    async fn remove_blobs(&self, files: &[SubmittedFile]) {
        for file in files {
            if let Err(e) = self.blobs.remove_file(&file.file_data_identifier).await {
                tracing::warn!(
                    file = %file.file_data_identifier,
                    error = %e,
                    "failed to remove submitted file from blob store"
                );
            }
        }
    }
}

/// Both services over one set of collaborators.
#[derive(Clone)]
pub struct AppServices {
    pub forms: FormService,
    pub submissions: SubmissionService,
}

impl AppServices {
    #[must_use]
    pub fn new(deps: Deps) -> Self {
        let deps = Arc::new(deps);
        Self {
            forms: FormService::new(Arc::clone(&deps)),
            submissions: SubmissionService::new(deps),
        }
    }
}
