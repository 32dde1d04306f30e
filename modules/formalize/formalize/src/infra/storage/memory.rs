//! In-memory repositories for tests and single-node deployments.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use formalize_sdk::{Form, Submission, SubmittedFile};
use parking_lot::RwLock;

use crate::domain::error::DomainError;
use crate::domain::repo::{FormsRepository, SubmissionsRepository};

#[derive(Default)]
pub struct InMemoryForms {
    forms: RwLock<BTreeMap<String, Form>>,
}

impl InMemoryForms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FormsRepository for InMemoryForms {
    async fn insert(&self, form: Form) -> Result<(), DomainError> {
        let mut forms = self.forms.write();
        if forms.contains_key(&form.identifier) {
            return Err(DomainError::conflict(format!("form '{}' already exists", form.identifier)));
        }
        forms.insert(form.identifier.clone(), form);
        Ok(())
    }

    async fn find(&self, identifier: &str) -> Result<Option<Form>, DomainError> {
        Ok(self.forms.read().get(identifier).cloned())
    }

    async fn list(&self) -> Result<Vec<Form>, DomainError> {
        Ok(self.forms.read().values().cloned().collect())
    }

    async fn update(&self, form: Form) -> Result<(), DomainError> {
        match self.forms.write().get_mut(&form.identifier) {
            Some(stored) => {
                *stored = form;
                Ok(())
            }
            None => Err(DomainError::not_found("form", form.identifier)),
        }
    }

    async fn delete(&self, identifier: &str) -> Result<bool, DomainError> {
        Ok(self.forms.write().remove(identifier).is_some())
    }
}

#[derive(Default)]
struct SubmissionTables {
    // ordered by identifier, which is a time-ordered UUID
    submissions: BTreeMap<String, Submission>,
    files: HashMap<String, Vec<SubmittedFile>>,
}

impl SubmissionTables {
    fn remove(&mut self, identifier: &str) -> Option<Vec<SubmittedFile>> {
        self.submissions.remove(identifier)?;
        Some(self.files.remove(identifier).unwrap_or_default())
    }
}

/// Submissions and the files they own, updated under one lock.
#[derive(Default)]
pub struct InMemorySubmissions {
    tables: RwLock<SubmissionTables>,
}

impl InMemorySubmissions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionsRepository for InMemorySubmissions {
    async fn insert(
        &self,
        submission: Submission,
        files: Vec<SubmittedFile>,
    ) -> Result<(), DomainError> {
        let mut tables = self.tables.write();
        if tables.submissions.contains_key(&submission.identifier) {
            return Err(DomainError::conflict(format!(
                "submission '{}' already exists",
                submission.identifier
            )));
        }
        if !files.is_empty() {
            tables.files.insert(submission.identifier.clone(), files);
        }
        tables
            .submissions
            .insert(submission.identifier.clone(), submission);
        Ok(())
    }

    async fn find(&self, identifier: &str) -> Result<Option<Submission>, DomainError> {
        Ok(self.tables.read().submissions.get(identifier).cloned())
    }

    async fn list_by_form(&self, form_identifier: &str) -> Result<Vec<Submission>, DomainError> {
        Ok(self
            .tables
            .read()
            .submissions
            .values()
            .filter(|s| s.form_identifier == form_identifier)
            .cloned()
            .collect())
    }

    async fn count_by_form_and_creator(
        &self,
        form_identifier: &str,
        creator_id: &str,
    ) -> Result<usize, DomainError> {
        Ok(self
            .tables
            .read()
            .submissions
            .values()
            .filter(|s| {
                s.form_identifier == form_identifier && s.creator_id.as_deref() == Some(creator_id)
            })
            .count())
    }

    async fn update(&self, submission: Submission) -> Result<(), DomainError> {
        let mut tables = self.tables.write();
        match tables.submissions.get_mut(&submission.identifier) {
            Some(stored) => {
                *stored = submission;
                Ok(())
            }
            None => Err(DomainError::not_found("submission", submission.identifier)),
        }
    }

    async fn files_of(
        &self,
        submission_identifier: &str,
    ) -> Result<Vec<SubmittedFile>, DomainError> {
        Ok(self
            .tables
            .read()
            .files
            .get(submission_identifier)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, identifier: &str) -> Result<Option<Vec<SubmittedFile>>, DomainError> {
        Ok(self.tables.write().remove(identifier))
    }

    async fn delete_by_form(
        &self,
        form_identifier: &str,
    ) -> Result<(Vec<String>, Vec<SubmittedFile>), DomainError> {
        let mut tables = self.tables.write();
        let ids: Vec<String> = tables
            .submissions
            .values()
            .filter(|s| s.form_identifier == form_identifier)
            .map(|s| s.identifier.clone())
            .collect();
        let mut files = Vec::new();
        for id in &ids {
            files.extend(tables.remove(id).unwrap_or_default());
        }
        Ok((ids, files))
    }
}
