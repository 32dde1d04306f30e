use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use formalize_sdk::{Form, FormAction, FormPatch, NewForm};
use time::OffsetDateTime;
use uuid::Uuid;

use super::Deps;
use crate::domain::authz::{RequestContext, policy::SubmissionAuthorization};
use crate::domain::error::DomainError;

#[derive(Clone)]
pub struct FormService {
    deps: Arc<Deps>,
}

impl FormService {
    pub(super) fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }

    /// # Errors
    ///
    /// `Forbidden` without `create_forms`, `Validation` for invalid definitions.
    #[tracing::instrument(skip_all, fields(user = ctx.user_identifier()))]
    pub async fn create_form(
        &self,
        ctx: &RequestContext,
        new_form: NewForm,
    ) -> Result<Form, DomainError> {
        DomainError::ensure_granted(self.deps.authz.can_create_forms(ctx).await?)?;

        let form = Form {
            identifier: Uuid::now_v7().to_string(),
            name: new_form.name,
            data_feed_schema: new_form.data_feed_schema,
            creator_id: ctx.user_identifier().map(ToOwned::to_owned),
            date_created: OffsetDateTime::now_utc(),
            grant_based_submission_authorization: new_form.grant_based_submission_authorization,
            legacy_client_scope_authorization: new_form.legacy_client_scope_authorization,
            allowed_submission_states: new_form.allowed_submission_states,
            actions_allowed_when_submitted: new_form.actions_allowed_when_submitted,
            max_num_submissions_per_creator: new_form
                .max_num_submissions_per_creator
                .unwrap_or(self.deps.config.default_max_num_submissions_per_creator),
            available_tags: new_form.available_tags,
            tag_permissions_for_submitters: new_form.tag_permissions_for_submitters,
        };
        validate_form(&form)?;

        self.deps.forms.insert(form.clone()).await?;
        if let Err(e) = self.deps.hooks.on_form_created(ctx, &form).await {
            self.undo_create(ctx, &form).await;
            return Err(e.into());
        }

        tracing::info!(form = %form.identifier, "form created");
        Ok(form)
    }

    async fn undo_create(&self, ctx: &RequestContext, form: &Form) {
        if let Err(e) = self.deps.forms.delete(&form.identifier).await {
            tracing::error!(form = %form.identifier, error = %e, "failed to undo form creation");
        }
        if let Err(e) = self.deps.hooks.on_form_deleted(ctx, form, &[]).await {
            tracing::warn!(
                form = %form.identifier,
                error = %e,
                "failed to drop partial form grants"
            );
        }
    }

    /// # Errors
    ///
    /// `NotFound`, `Forbidden` without `read`.
    pub async fn get_form(
        &self,
        ctx: &RequestContext,
        identifier: &str,
    ) -> Result<Form, DomainError> {
        let form = self.deps.load_form(identifier).await?;
        DomainError::ensure_granted(self.deps.authz.can_read_form(ctx, &form).await?)?;
        Ok(form)
    }

    /// Forms the current user may read.
    ///
    /// # Errors
    ///
    /// Grant store and storage failures.
    pub async fn list_forms(&self, ctx: &RequestContext) -> Result<Vec<Form>, DomainError> {
        let mut readable = Vec::new();
        for form in self.deps.forms.list().await? {
            if self.deps.authz.can_read_form(ctx, &form).await? {
                readable.push(form);
            }
        }
        Ok(readable)
    }

    /// # Errors
    ///
    /// `NotFound`, `Forbidden` without `update`, `Validation`.
    #[tracing::instrument(skip_all, fields(form = identifier))]
    pub async fn update_form(
        &self,
        ctx: &RequestContext,
        identifier: &str,
        patch: FormPatch,
    ) -> Result<Form, DomainError> {
        let mut form = self.deps.load_form(identifier).await?;
        DomainError::ensure_granted(self.deps.authz.can_update_form(ctx, &form).await?)?;

        apply_patch(&mut form, patch);
        validate_form(&form)?;
        self.deps.forms.update(form.clone()).await?;
        tracing::debug!("form updated");
        Ok(form)
    }

    /// Delete a form, its submissions with their files, and all their grants.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` without `delete`.
    #[tracing::instrument(skip_all, fields(form = identifier))]
    pub async fn delete_form(
        &self,
        ctx: &RequestContext,
        identifier: &str,
    ) -> Result<(), DomainError> {
        let form = self.deps.load_form(identifier).await?;
        DomainError::ensure_granted(self.deps.authz.can_delete_form(ctx, &form).await?)?;

        let submission_ids: Vec<String> = self
            .deps
            .submissions
            .list_by_form(identifier)
            .await?
            .into_iter()
            .map(|s| s.identifier)
            .collect();
        self.deps
            .hooks
            .on_form_deleted(ctx, &form, &submission_ids)
            .await?;

        let (_, files) = self.deps.submissions.delete_by_form(identifier).await?;
        self.deps.forms.delete(identifier).await?;
        self.deps.remove_blobs(&files).await;

        tracing::info!(submissions = submission_ids.len(), "form deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// `NotFound`, grant store failures.
    pub async fn granted_form_actions(
        &self,
        ctx: &RequestContext,
        identifier: &str,
    ) -> Result<BTreeSet<FormAction>, DomainError> {
        let form = self.deps.load_form(identifier).await?;
        Ok(self.deps.authz.granted_form_actions(ctx, &form).await?)
    }
}

fn apply_patch(form: &mut Form, patch: FormPatch) {
    let FormPatch {
        name,
        data_feed_schema,
        grant_based_submission_authorization,
        allowed_submission_states,
        actions_allowed_when_submitted,
        max_num_submissions_per_creator,
        available_tags,
        tag_permissions_for_submitters,
    } = patch;

    if let Some(name) = name {
        form.name = name;
    }
    if let Some(schema) = data_feed_schema {
        form.data_feed_schema = schema;
    }
    if let Some(flag) = grant_based_submission_authorization {
        form.grant_based_submission_authorization = flag;
    }
    if let Some(states) = allowed_submission_states {
        form.allowed_submission_states = states;
    }
    if let Some(actions) = actions_allowed_when_submitted {
        form.actions_allowed_when_submitted = actions;
    }
    if let Some(max) = max_num_submissions_per_creator {
        form.max_num_submissions_per_creator = max;
    }
    if let Some(tags) = available_tags {
        form.available_tags = tags;
    }
    if let Some(permissions) = tag_permissions_for_submitters {
        form.tag_permissions_for_submitters = permissions;
    }
}

fn validate_form(form: &Form) -> Result<(), DomainError> {
    if form.name.default.trim().is_empty() {
        return Err(DomainError::validation("name", "must not be empty"));
    }
    if form.allowed_submission_states.is_empty() {
        return Err(DomainError::validation(
            "allowed_submission_states",
            "at least one state must be allowed",
        ));
    }
    if SubmissionAuthorization::of(form).is_err() {
        return Err(DomainError::validation(
            "legacy_client_scope_authorization",
            "cannot be combined with grant-based submission authorization",
        ));
    }

    let mut seen = HashSet::new();
    for tag in &form.available_tags {
        if tag.identifier.is_empty() {
            return Err(DomainError::validation(
                "available_tags",
                "tag identifier must not be empty",
            ));
        }
        if !seen.insert(tag.identifier.as_str()) {
            return Err(DomainError::validation(
                "available_tags",
                format!("duplicate tag '{}'", tag.identifier),
            ));
        }
    }
    Ok(())
}
