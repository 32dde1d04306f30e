//! Public API trait for the formalize module.

use std::collections::BTreeSet;

use async_trait::async_trait;
use formalize_security::SecurityContext;

use crate::actions::FormAction;
use crate::error::FormalizeError;
use crate::models::{
    Form, FormPatch, NewForm, NewSubmission, Submission, SubmissionPatch, SubmittedFileDetails,
};

/// Public API of the formalize module.
///
/// Every call is one request: permission decisions are cached for the
/// duration of the call only.
///
/// ```ignore
/// let form = client.get_form(&ctx, "form-id").await?;
/// let submissions = client.list_submissions(&ctx, &form.identifier).await?;
/// ```
#[async_trait]
pub trait FormalizeClient: Send + Sync {
    /// # Errors
    ///
    /// - `Forbidden` without the collection-level `create_forms` grant
    /// - `Validation` for invalid form definitions
    /// - `ServiceUnavailable` if the grant store cannot be reached
    async fn create_form(
        &self,
        ctx: &SecurityContext,
        new_form: NewForm,
    ) -> Result<Form, FormalizeError>;

    /// # Errors
    ///
    /// - `NotFound`, `Forbidden`, `ServiceUnavailable`
    async fn get_form(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<Form, FormalizeError>;

    /// Forms the current user may read.
    ///
    /// # Errors
    ///
    /// - `ServiceUnavailable`
    async fn list_forms(&self, ctx: &SecurityContext) -> Result<Vec<Form>, FormalizeError>;

    /// # Errors
    ///
    /// - `NotFound`, `Forbidden`, `Validation`, `ServiceUnavailable`
    async fn update_form(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
        patch: FormPatch,
    ) -> Result<Form, FormalizeError>;

    /// Delete a form with all of its submissions and grants.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `Forbidden`, `ServiceUnavailable`
    async fn delete_form(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<(), FormalizeError>;

    /// Actions the current user may perform on a form.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `ServiceUnavailable`
    async fn granted_form_actions(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<BTreeSet<FormAction>, FormalizeError>;

    /// # Errors
    ///
    /// - `NotFound` if the form does not exist
    /// - `Forbidden`, `Validation`, `Conflict`, `ServiceUnavailable`
    async fn create_submission(
        &self,
        ctx: &SecurityContext,
        new_submission: NewSubmission,
    ) -> Result<Submission, FormalizeError>;

    /// The returned submission carries `granted_actions` for the current user.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `Forbidden`, `ServiceUnavailable`
    async fn get_submission(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<Submission, FormalizeError>;

    /// Submissions of a form visible to the current user.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `ServiceUnavailable`
    async fn list_submissions(
        &self,
        ctx: &SecurityContext,
        form_identifier: &str,
    ) -> Result<Vec<Submission>, FormalizeError>;

    /// # Errors
    ///
    /// - `NotFound`, `Forbidden`, `Validation`, `ServiceUnavailable`
    async fn update_submission(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
        patch: SubmissionPatch,
    ) -> Result<Submission, FormalizeError>;

    /// Replace the tags of a submission.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `Forbidden`, `Validation`, `ServiceUnavailable`
    async fn set_submission_tags(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
        tags: BTreeSet<String>,
    ) -> Result<Submission, FormalizeError>;

    /// # Errors
    ///
    /// - `NotFound`, `Forbidden`, `ServiceUnavailable`
    async fn delete_submission(
        &self,
        ctx: &SecurityContext,
        identifier: &str,
    ) -> Result<(), FormalizeError>;

    /// Remove every submission of a form. Returns the number removed.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `Forbidden`, `ServiceUnavailable`
    async fn remove_all_submissions_of_form(
        &self,
        ctx: &SecurityContext,
        form_identifier: &str,
    ) -> Result<usize, FormalizeError>;

    /// # Errors
    ///
    /// - `NotFound`, `Forbidden`, `ServiceUnavailable`
    async fn get_submitted_file(
        &self,
        ctx: &SecurityContext,
        submission_identifier: &str,
        file_identifier: &str,
    ) -> Result<SubmittedFileDetails, FormalizeError>;
}
