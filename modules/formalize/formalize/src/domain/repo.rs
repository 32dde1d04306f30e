use async_trait::async_trait;
use formalize_sdk::{Form, Submission, SubmittedFile};

use super::error::DomainError;

#[async_trait]
pub trait FormsRepository: Send + Sync {
    /// # Errors
    ///
    /// [`DomainError::Conflict`] if a form with the same identifier exists.
    async fn insert(&self, form: Form) -> Result<(), DomainError>;

    async fn find(&self, identifier: &str) -> Result<Option<Form>, DomainError>;

    async fn list(&self) -> Result<Vec<Form>, DomainError>;

    /// # Errors
    ///
    /// [`DomainError::NotFound`] if the form does not exist.
    async fn update(&self, form: Form) -> Result<(), DomainError>;

    /// Returns whether a form was removed.
    async fn delete(&self, identifier: &str) -> Result<bool, DomainError>;
}

/// Submissions together with the files they own.
#[async_trait]
pub trait SubmissionsRepository: Send + Sync {
    /// # Errors
    ///
    /// [`DomainError::Conflict`] if a submission with the same identifier exists.
    async fn insert(
        &self,
        submission: Submission,
        files: Vec<SubmittedFile>,
    ) -> Result<(), DomainError>;

    async fn find(&self, identifier: &str) -> Result<Option<Submission>, DomainError>;

    async fn list_by_form(&self, form_identifier: &str) -> Result<Vec<Submission>, DomainError>;

    async fn count_by_form_and_creator(
        &self,
        form_identifier: &str,
        creator_id: &str,
    ) -> Result<usize, DomainError>;

    /// # Errors
    ///
    /// [`DomainError::NotFound`] if the submission does not exist.
    async fn update(&self, submission: Submission) -> Result<(), DomainError>;

    async fn files_of(
        &self,
        submission_identifier: &str,
    ) -> Result<Vec<SubmittedFile>, DomainError>;

    /// Remove a submission with its files. Returns the removed files.
    async fn delete(&self, identifier: &str) -> Result<Option<Vec<SubmittedFile>>, DomainError>;

    /// Remove every submission of a form with their files.
    ///
    /// Returns the identifiers of the removed submissions and their files.
    async fn delete_by_form(
        &self,
        form_identifier: &str,
    ) -> Result<(Vec<String>, Vec<SubmittedFile>), DomainError>;
}
