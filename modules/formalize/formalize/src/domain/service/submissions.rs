use std::collections::BTreeSet;
use std::sync::Arc;

use formalize_sdk::{
    Form, NewSubmission, Submission, SubmissionAction, SubmissionPatch, SubmissionState,
    SubmittedFile, SubmittedFileDetails,
};
use time::OffsetDateTime;
use uuid::Uuid;

use super::Deps;
use crate::domain::authz::RequestContext;
use crate::domain::error::DomainError;

#[derive(Clone)]
pub struct SubmissionService {
    deps: Arc<Deps>,
}

impl SubmissionService {
    pub(super) fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }

    async fn load(&self, identifier: &str) -> Result<(Form, Submission), DomainError> {
        let submission = self
            .deps
            .submissions
            .find(identifier)
            .await?
            .ok_or_else(|| DomainError::not_found("submission", identifier))?;
        let form = self.deps.load_form(&submission.form_identifier).await?;
        Ok((form, submission))
    }

    /// Load a submission and check that the current user may perform `action`.
    ///
    /// The returned submission carries the user's granted actions.
    async fn load_authorized(
        &self,
        ctx: &RequestContext,
        identifier: &str,
        action: SubmissionAction,
    ) -> Result<(Form, Submission), DomainError> {
        let (form, mut submission) = self.load(identifier).await?;
        let granted = self
            .deps
            .authz
            .granted_actions_for(ctx, &form, &submission)
            .await?;
        DomainError::ensure_granted(granted.contains(&action))?;
        submission.granted_actions = Some(granted);
        Ok((form, submission))
    }

    async fn with_granted_actions(
        &self,
        ctx: &RequestContext,
        form: &Form,
        mut submission: Submission,
    ) -> Result<Submission, DomainError> {
        let granted = self
            .deps
            .authz
            .granted_actions_for(ctx, form, &submission)
            .await?;
        submission.granted_actions = Some(granted);
        Ok(submission)
    }

    /// # Errors
    ///
    /// - `NotFound` if the form or a referenced file does not exist
    /// - `Forbidden` without a right to submit, or tags without `write_tags`
    /// - `Validation` for disallowed states, missing data or unknown tags
    /// - `Conflict` once the per-creator limit is reached
    #[tracing::instrument(
        skip_all,
        fields(form = %new_submission.form_identifier, user = ctx.user_identifier())
    )]
    pub async fn create_submission(
        &self,
        ctx: &RequestContext,
        new_submission: NewSubmission,
    ) -> Result<Submission, DomainError> {
        let form = self.deps.load_form(&new_submission.form_identifier).await?;
        DomainError::ensure_granted(self.deps.authz.can_create_submissions(ctx, &form).await?)?;

        let state = new_submission.submission_state.unwrap_or(
            if form.allows_state(SubmissionState::Submitted) {
                SubmissionState::Submitted
            } else {
                SubmissionState::Draft
            },
        );
        validate_state(&form, state, new_submission.data_feed_element.as_deref())?;
        validate_tags(&form, &new_submission.tags)?;
        self.check_creator_limit(ctx, &form).await?;

        let now = OffsetDateTime::now_utc();
        let user = ctx.user_identifier().map(ToOwned::to_owned);
        let submission = Submission {
            identifier: Uuid::now_v7().to_string(),
            form_identifier: form.identifier.clone(),
            data_feed_element: new_submission.data_feed_element,
            submission_state: state,
            creator_id: user.clone(),
            last_modified_by_id: user,
            date_created: now,
            date_last_modified: now,
            tags: new_submission.tags,
            granted_actions: None,
        };

        if !submission.tags.is_empty() {
            let granted = self
                .deps
                .authz
                .granted_actions_for(ctx, &form, &submission)
                .await?;
            DomainError::ensure_granted(granted.contains(&SubmissionAction::WriteTags))?;
        }

        let mut files = Vec::with_capacity(new_submission.files.len());
        for file in new_submission.files {
            self.deps
                .blobs
                .file_metadata(&file.file_data_identifier)
                .await?;
            files.push(SubmittedFile {
                identifier: Uuid::now_v7().to_string(),
                submission_identifier: submission.identifier.clone(),
                file_attribute_name: file.file_attribute_name,
                file_data_identifier: file.file_data_identifier,
            });
        }

        self.deps
            .submissions
            .insert(submission.clone(), files)
            .await?;
        if let Err(e) = self
            .deps
            .hooks
            .on_submission_created(ctx, &form, &submission)
            .await
        {
            self.undo_create(ctx, &submission).await;
            return Err(e.into());
        }

        tracing::info!(submission = %submission.identifier, state = ?state, "submission created");
        self.with_granted_actions(ctx, &form, submission).await
    }

    async fn check_creator_limit(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<(), DomainError> {
        let max = form.max_num_submissions_per_creator;
        let Some(creator) = ctx.user_identifier() else {
            return Ok(());
        };
        if max == 0 {
            return Ok(());
        }
        let count = self
            .deps
            .submissions
            .count_by_form_and_creator(&form.identifier, creator)
            .await?;
        if count >= usize::try_from(max).unwrap_or(usize::MAX) {
            return Err(DomainError::conflict(format!(
                "maximum number of submissions per creator ({max}) reached"
            )));
        }
        Ok(())
    }

    async fn undo_create(&self, ctx: &RequestContext, submission: &Submission) {
        if let Err(e) = self.deps.submissions.delete(&submission.identifier).await {
            tracing::error!(
                submission = %submission.identifier,
                error = %e,
                "failed to undo submission creation"
            );
        }
        if let Err(e) = self.deps.hooks.on_submission_deleted(ctx, submission).await {
            tracing::warn!(
                submission = %submission.identifier,
                error = %e,
                "failed to drop partial submission grants"
            );
        }
    }

    /// # Errors
    ///
    /// `NotFound`, `Forbidden` without `read`.
    pub async fn get_submission(
        &self,
        ctx: &RequestContext,
        identifier: &str,
    ) -> Result<Submission, DomainError> {
        let (_, submission) = self
            .load_authorized(ctx, identifier, SubmissionAction::Read)
            .await?;
        Ok(submission)
    }

    /// All submissions with `read_submissions` on the form, otherwise only
    /// the readable ones.
    ///
    /// # Errors
    ///
    /// `NotFound` if the form does not exist, grant store failures.
    pub async fn list_submissions(
        &self,
        ctx: &RequestContext,
        form_identifier: &str,
    ) -> Result<Vec<Submission>, DomainError> {
        let form = self.deps.load_form(form_identifier).await?;
        let read_all = self.deps.authz.can_read_form_submissions(ctx, &form).await?;

        let mut visible = Vec::new();
        for submission in self.deps.submissions.list_by_form(form_identifier).await? {
            let submission = self.with_granted_actions(ctx, &form, submission).await?;
            let readable = submission
                .granted_actions
                .as_ref()
                .is_some_and(|granted| granted.contains(&SubmissionAction::Read));
            if read_all || readable {
                visible.push(submission);
            }
        }
        Ok(visible)
    }

    /// # Errors
    ///
    /// `NotFound`, `Forbidden` without `update`, `Validation` for
    /// disallowed state transitions.
    #[tracing::instrument(skip_all, fields(submission = identifier))]
    pub async fn update_submission(
        &self,
        ctx: &RequestContext,
        identifier: &str,
        patch: SubmissionPatch,
    ) -> Result<Submission, DomainError> {
        let (form, mut submission) = self
            .load_authorized(ctx, identifier, SubmissionAction::Update)
            .await?;

        let target = patch.submission_state.unwrap_or(submission.submission_state);
        if submission.submission_state == SubmissionState::Submitted
            && target == SubmissionState::Draft
        {
            return Err(DomainError::validation(
                "submission_state",
                "a submitted submission cannot return to draft",
            ));
        }
        if let Some(data) = patch.data_feed_element {
            submission.data_feed_element = Some(data);
        }
        validate_state(&form, target, submission.data_feed_element.as_deref())?;

        submission.submission_state = target;
        submission.last_modified_by_id = ctx.user_identifier().map(ToOwned::to_owned);
        submission.date_last_modified = OffsetDateTime::now_utc();
        self.deps.submissions.update(submission.clone()).await?;

        tracing::debug!(state = ?target, "submission updated");
        self.with_granted_actions(ctx, &form, submission).await
    }

    /// Replace the tags of a submission.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` without `write_tags`, `Validation` for unknown tags.
    pub async fn set_submission_tags(
        &self,
        ctx: &RequestContext,
        identifier: &str,
        tags: BTreeSet<String>,
    ) -> Result<Submission, DomainError> {
        let (form, mut submission) = self
            .load_authorized(ctx, identifier, SubmissionAction::WriteTags)
            .await?;
        validate_tags(&form, &tags)?;

        submission.tags = tags;
        submission.last_modified_by_id = ctx.user_identifier().map(ToOwned::to_owned);
        submission.date_last_modified = OffsetDateTime::now_utc();
        self.deps.submissions.update(submission.clone()).await?;
        Ok(submission)
    }

    /// # Errors
    ///
    /// `NotFound`, `Forbidden` without `delete`.
    #[tracing::instrument(skip_all, fields(submission = identifier))]
    pub async fn delete_submission(
        &self,
        ctx: &RequestContext,
        identifier: &str,
    ) -> Result<(), DomainError> {
        let (_, submission) = self
            .load_authorized(ctx, identifier, SubmissionAction::Delete)
            .await?;

        self.deps
            .hooks
            .on_submission_deleted(ctx, &submission)
            .await?;
        let files = self
            .deps
            .submissions
            .delete(identifier)
            .await?
            .unwrap_or_default();
        self.deps.remove_blobs(&files).await;

        tracing::info!(files = files.len(), "submission deleted");
        Ok(())
    }

    /// Remove every submission of a form. Returns the number removed.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` without `delete_submissions` on the form.
    #[tracing::instrument(skip_all, fields(form = form_identifier))]
    pub async fn remove_all_submissions_of_form(
        &self,
        ctx: &RequestContext,
        form_identifier: &str,
    ) -> Result<usize, DomainError> {
        let form = self.deps.load_form(form_identifier).await?;
        DomainError::ensure_granted(
            self.deps
                .authz
                .can_delete_form_submissions(ctx, &form)
                .await?,
        )?;

        let ids: Vec<String> = self
            .deps
            .submissions
            .list_by_form(form_identifier)
            .await?
            .into_iter()
            .map(|s| s.identifier)
            .collect();
        self.deps
            .hooks
            .on_all_submissions_of_form_deleted(ctx, form_identifier, &ids)
            .await?;

        let (removed, files) = self.deps.submissions.delete_by_form(form_identifier).await?;
        self.deps.remove_blobs(&files).await;

        tracing::info!(removed = removed.len(), "removed all submissions of form");
        Ok(removed.len())
    }

    /// A submitted file with its metadata from the blob store.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown submissions or files, `Forbidden` without
    /// `read` on the submission, blob store failures.
    pub async fn get_submitted_file(
        &self,
        ctx: &RequestContext,
        submission_identifier: &str,
        file_identifier: &str,
    ) -> Result<SubmittedFileDetails, DomainError> {
        self.load_authorized(ctx, submission_identifier, SubmissionAction::Read)
            .await?;

        let file = self
            .deps
            .submissions
            .files_of(submission_identifier)
            .await?
            .into_iter()
            .find(|f| f.identifier == file_identifier)
            .ok_or_else(|| DomainError::not_found("submitted file", file_identifier))?;
        let metadata = self
            .deps
            .blobs
            .file_metadata(&file.file_data_identifier)
            .await?;
        Ok(SubmittedFileDetails { file, metadata })
    }
}

fn validate_state(
    form: &Form,
    state: SubmissionState,
    data_feed_element: Option<&str>,
) -> Result<(), DomainError> {
    if !form.allows_state(state) {
        return Err(DomainError::validation(
            "submission_state",
            format!("state {state} is not allowed by the form"),
        ));
    }
    if state != SubmissionState::Draft && data_feed_element.is_none() {
        return Err(DomainError::validation(
            "data_feed_element",
            "required unless the submission is a draft",
        ));
    }
    Ok(())
}

fn validate_tags(form: &Form, tags: &BTreeSet<String>) -> Result<(), DomainError> {
    match tags.iter().find(|tag| !form.has_tag(tag)) {
        Some(unknown) => Err(DomainError::validation(
            "tags",
            format!("tag '{unknown}' is not available on the form"),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::repo::SubmissionsRepository;
    use crate::test_support::{Harness, form_fixture};
    use formalize_sdk::{
        GrantStoreError, NewForm, ResourceClass, SubmissionStates, Tag, TagPermissions,
    };
    use formalize_security::SecurityContext;

    fn editor() -> RequestContext {
        RequestContext::new(
            SecurityContext::builder()
                .user_identifier("erin")
                .group("editors")
                .build(),
        )
    }

    fn user(name: &str) -> RequestContext {
        RequestContext::new(SecurityContext::for_user(name))
    }

    fn filled(form: &Form) -> NewSubmission {
        NewSubmission::new(&form.identifier).data_feed_element("{}")
    }

    fn new_draft(form: &Form) -> NewSubmission {
        NewSubmission::new(&form.identifier).state(SubmissionState::Draft)
    }

    async fn open_form(h: &Harness, configure: impl FnOnce(&mut NewForm)) -> Form {
        h.allow_form_creation("editors");
        let mut new_form = NewForm::new("Survey");
        configure(&mut new_form);
        let form = h
            .services
            .forms
            .create_form(&editor(), new_form)
            .await
            .unwrap();
        h.allow_submitting(&["alice", "bob"]);
        form
    }

    #[test]
    fn state_rules() {
        let mut form = form_fixture("f1", false);
        form.allowed_submission_states = SubmissionStates::SUBMITTED;
        assert!(validate_state(&form, SubmissionState::Draft, None).is_err());
        assert!(validate_state(&form, SubmissionState::Submitted, None).is_err());
        assert!(validate_state(&form, SubmissionState::Submitted, Some("{}")).is_ok());

        form.allowed_submission_states = SubmissionStates::ALL;
        assert!(validate_state(&form, SubmissionState::Draft, None).is_ok());
    }

    #[test]
    fn tags_must_be_available() {
        let mut form = form_fixture("f1", false);
        form.available_tags = vec![Tag::new("urgent")];
        assert!(validate_tags(&form, &BTreeSet::from(["urgent".to_owned()])).is_ok());
        assert!(validate_tags(&form, &BTreeSet::from(["other".to_owned()])).is_err());
    }

    #[tokio::test]
    async fn creator_limit_is_enforced() {
        let h = Harness::new();
        let form = open_form(&h, |f| f.max_num_submissions_per_creator = Some(1)).await;
        let alice = user("alice");

        h.services
            .submissions
            .create_submission(&alice, filled(&form))
            .await
            .unwrap();
        let err = h
            .services
            .submissions
            .create_submission(&alice, filled(&form))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        h.services
            .submissions
            .create_submission(&user("bob"), filled(&form))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn zero_limit_means_unlimited() {
        let h = Harness::new();
        let form = open_form(&h, |f| f.max_num_submissions_per_creator = Some(0)).await;
        let alice = user("alice");
        for _ in 0..3 {
            h.services
                .submissions
                .create_submission(&alice, filled(&form))
                .await
                .unwrap();
        }
        assert_eq!(
            h.submissions
                .count_by_form_and_creator(&form.identifier, "alice")
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn submitted_cannot_go_back_to_draft() {
        let h = Harness::new();
        let form = open_form(&h, |f| {
            f.allowed_submission_states = SubmissionStates::ALL;
            f.actions_allowed_when_submitted = BTreeSet::from([SubmissionAction::Update]);
        })
        .await;
        let alice = user("alice");
        let submission = h
            .services
            .submissions
            .create_submission(&alice, filled(&form))
            .await
            .unwrap();
        assert_eq!(submission.submission_state, SubmissionState::Submitted);

        let err = h
            .services
            .submissions
            .update_submission(
                &alice,
                &submission.identifier,
                SubmissionPatch {
                    submission_state: Some(SubmissionState::Draft),
                    ..SubmissionPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn draft_can_be_submitted_by_creator() {
        let h = Harness::new();
        let form = open_form(&h, |f| f.allowed_submission_states = SubmissionStates::ALL).await;
        let alice = user("alice");
        let draft = h
            .services
            .submissions
            .create_submission(&alice, new_draft(&form))
            .await
            .unwrap();

        let submitted = h
            .services
            .submissions
            .update_submission(
                &alice,
                &draft.identifier,
                SubmissionPatch {
                    data_feed_element: Some(r#"{"answer": 42}"#.to_owned()),
                    submission_state: Some(SubmissionState::Submitted),
                },
            )
            .await
            .unwrap();

        assert_eq!(submitted.submission_state, SubmissionState::Submitted);
        assert_eq!(submitted.last_modified_by_id.as_deref(), Some("alice"));
        assert_eq!(submitted.granted_actions, Some(BTreeSet::new()));
    }

    #[tokio::test]
    async fn tags_need_write_permission() {
        let h = Harness::new();
        let form = open_form(&h, |f| {
            f.available_tags = vec![Tag::new("urgent")];
            f.tag_permissions_for_submitters = TagPermissions::Read;
        })
        .await;

        let err = h
            .services
            .submissions
            .create_submission(&user("alice"), filled(&form).tag("urgent"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));

        let tagged = h
            .services
            .submissions
            .create_submission(&editor(), filled(&form).tag("urgent"))
            .await
            .unwrap();
        assert!(tagged.tags.contains("urgent"));

        let retagged = h
            .services
            .submissions
            .set_submission_tags(&editor(), &tagged.identifier, BTreeSet::new())
            .await
            .unwrap();
        assert!(retagged.tags.is_empty());
    }

    #[tokio::test]
    async fn files_resolve_metadata_from_blob_store() {
        let h = Harness::new();
        let form = open_form(&h, |f| f.allowed_submission_states = SubmissionStates::ALL).await;
        let alice = user("alice");
        let submission = h
            .services
            .submissions
            .create_submission(
                &alice,
                NewSubmission::new(&form.identifier)
                    .state(SubmissionState::Draft)
                    .file("cv", "blob-7"),
            )
            .await
            .unwrap();
        let file = h
            .submissions
            .files_of(&submission.identifier)
            .await
            .unwrap()
            .remove(0);

        let details = h
            .services
            .submissions
            .get_submitted_file(&alice, &submission.identifier, &file.identifier)
            .await
            .unwrap();
        assert_eq!(details.metadata.file_name, "blob-7.pdf");

        let err = h
            .services
            .submissions
            .get_submitted_file(&user("bob"), &submission.identifier, &file.identifier)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));
    }

    #[tokio::test]
    async fn unknown_blob_is_rejected_on_create() {
        let h = Harness::new();
        let form = open_form(&h, |_| {}).await;

        let err = h
            .services
            .submissions
            .create_submission(
                &user("alice"),
                NewSubmission::new(&form.identifier)
                    .data_feed_element("{}")
                    .file("cv", "missing-blob"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::BlobStore(_)));
        assert!(
            h.submissions
                .list_by_form(&form.identifier)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn failed_submission_grant_rolls_back() {
        let h = Harness::new();
        let form = open_form(&h, |f| f.grant_based_submission_authorization = true).await;
        h.grants
            .fail_registration_with(GrantStoreError::Unavailable("down".to_owned()));

        let err = h
            .services
            .submissions
            .create_submission(&user("alice"), filled(&form))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::GrantStore(_)));
        assert!(
            h.submissions
                .list_by_form(&form.identifier)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn failed_manage_grant_unregisters_the_submission() {
        let h = Harness::new();
        let form = open_form(&h, |f| f.grant_based_submission_authorization = true).await;
        let resources = h.grants.resource_count();
        let grants = h.grants.grant_count();
        h.grants
            .fail_grants_with(GrantStoreError::Unavailable("down".to_owned()));

        let err = h
            .services
            .submissions
            .create_submission(&user("alice"), filled(&form))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::GrantStore(_)));
        assert!(
            h.submissions
                .list_by_form(&form.identifier)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(h.grants.resource_count(), resources);
        assert_eq!(h.grants.grant_count(), grants);
        assert!(
            h.grants
                .is_registered(ResourceClass::Form, Some(form.identifier.as_str()))
        );
    }

    #[tokio::test]
    async fn form_managers_list_everything_creators_their_own() {
        let h = Harness::new();
        let form = open_form(&h, |f| f.allowed_submission_states = SubmissionStates::ALL).await;
        for name in ["alice", "bob"] {
            h.services
                .submissions
                .create_submission(&user(name), new_draft(&form))
                .await
                .unwrap();
        }

        assert_eq!(
            h.services
                .submissions
                .list_submissions(&editor(), &form.identifier)
                .await
                .unwrap()
                .len(),
            2
        );
        let own = h
            .services
            .submissions
            .list_submissions(&user("alice"), &form.identifier)
            .await
            .unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].creator_id.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn remove_all_requires_delete_submissions() {
        let h = Harness::new();
        let form = open_form(&h, |_| {}).await;
        h.services
            .submissions
            .create_submission(&user("alice"), filled(&form))
            .await
            .unwrap();

        let err = h
            .services
            .submissions
            .remove_all_submissions_of_form(&user("alice"), &form.identifier)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));

        let removed = h
            .services
            .submissions
            .remove_all_submissions_of_form(&editor(), &form.identifier)
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
