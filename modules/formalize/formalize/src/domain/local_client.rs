//! Local (in-process) client for the formalize module.

use std::collections::BTreeSet;

use async_trait::async_trait;
use formalize_sdk::{
    Form, FormAction, FormPatch, FormalizeClient, FormalizeError, NewForm, NewSubmission,
    Submission, SubmissionPatch, SubmittedFileDetails,
};
use formalize_security::SecurityContext;

use super::authz::RequestContext;
use super::error::DomainError;
use super::service::AppServices;

/// Local client wrapping the services.
///
/// Every call is a request of its own and gets a fresh grant cache.
pub struct FormalizeLocalClient {
    services: AppServices,
}

impl FormalizeLocalClient {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }
}

fn request(ctx: &SecurityContext) -> RequestContext {
    RequestContext::new(ctx.clone())
}

fn log_and_convert(op: &str, e: DomainError) -> FormalizeError {
    match &e {
        DomainError::GrantStore(_)
        | DomainError::BlobStore(_)
        | DomainError::InvalidConfiguration(_)
        | DomainError::Storage(_) => {
            tracing::error!(operation = op, error = %e, "formalize call failed");
        }
        DomainError::NotFound { .. }
        | DomainError::Forbidden
        | DomainError::Validation { .. }
        | DomainError::Conflict(_) => {
            tracing::debug!(operation = op, error = %e, "formalize call rejected");
        }
    }
    e.into()
}

#[async_trait]
impl FormalizeClient for FormalizeLocalClient {
    async fn create_form(
        &self,
        ctx: &SecurityContext,
        new_form: NewForm,
    ) -> Result<Form, FormalizeError> {
        self.services
            .forms
            .create_form(&request(ctx), new_form)
            .await
            .map_err(|e| log_and_convert("create_form", e))
    }

    async fn get_form(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<Form, FormalizeError> {
        self.services
            .forms
            .get_form(&request(ctx), identifier)
            .await
            .map_err(|e| log_and_convert("get_form", e))
    }

    async fn list_forms(&self, ctx: &SecurityContext) -> Result<Vec<Form>, FormalizeError> {
        self.services
            .forms
            .list_forms(&request(ctx))
            .await
            .map_err(|e| log_and_convert("list_forms", e))
    }

    async fn update_form(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
        patch: FormPatch,
    ) -> Result<Form, FormalizeError> {
        self.services
            .forms
            .update_form(&request(ctx), identifier, patch)
            .await
            .map_err(|e| log_and_convert("update_form", e))
    }

    async fn delete_form(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<(), FormalizeError> {
        self.services
            .forms
            .delete_form(&request(ctx), identifier)
            .await
            .map_err(|e| log_and_convert("delete_form", e))
    }

    async fn granted_form_actions(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<BTreeSet<FormAction>, FormalizeError> {
        self.services
            .forms
            .granted_form_actions(&request(ctx), identifier)
            .await
            .map_err(|e| log_and_convert("granted_form_actions", e))
    }

    async fn create_submission(
        &self,
        ctx: &SecurityContext,
        new_submission: NewSubmission,
    ) -> Result<Submission, FormalizeError> {
        self.services
            .submissions
            .create_submission(&request(ctx), new_submission)
            .await
            .map_err(|e| log_and_convert("create_submission", e))
    }

    async fn get_submission(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<Submission, FormalizeError> {
        self.services
            .submissions
            .get_submission(&request(ctx), identifier)
            .await
            .map_err(|e| log_and_convert("get_submission", e))
    }

    async fn list_submissions(
        &self,
        ctx: &SecurityContext,
        form_identifier: &str,
    ) -> Result<Vec<Submission>, FormalizeError> {
        self.services
            .submissions
            .list_submissions(&request(ctx), form_identifier)
            .await
            .map_err(|e| log_and_convert("list_submissions", e))
    }

    async fn update_submission(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
        patch: SubmissionPatch,
    ) -> Result<Submission, FormalizeError> {
        self.services
            .submissions
            .update_submission(&request(ctx), identifier, patch)
            .await
            .map_err(|e| log_and_convert("update_submission", e))
    }

    async fn set_submission_tags(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
        tags: BTreeSet<String>,
    ) -> Result<Submission, FormalizeError> {
        self.services
            .submissions
            .set_submission_tags(&request(ctx), identifier, tags)
            .await
            .map_err(|e| log_and_convert("set_submission_tags", e))
    }

    async fn delete_submission(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<(), FormalizeError> {
        self.services
            .submissions
            .delete_submission(&request(ctx), identifier)
            .await
            .map_err(|e| log_and_convert("delete_submission", e))
    }

    async fn remove_all_submissions_of_form(
        &self,
        ctx: &SecurityContext,
        form_identifier: &str,
    ) -> Result<usize, FormalizeError> {
        self.services
            .submissions
            .remove_all_submissions_of_form(&request(ctx), form_identifier)
            .await
            .map_err(|e| log_and_convert("remove_all_submissions_of_form", e))
    }

    async fn get_submitted_file(
        &self,
        ctx: &SecurityContext,
        submission_identifier: &str,
        file_identifier: &str,
    ) -> Result<SubmittedFileDetails, FormalizeError> {
        self.services
            .submissions
            .get_submitted_file(&request(ctx), submission_identifier, file_identifier)
            .await
            .map_err(|e| log_and_convert("get_submitted_file", e))
    }
}
