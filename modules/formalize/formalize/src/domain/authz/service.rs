use std::collections::BTreeSet;
use std::sync::Arc;

use formalize_sdk::{
    Form, FormAction, FormCollectionAction, ResourceClass, ResourceGrantClient, Submission,
    SubmissionAction, SubmissionCollectionAction,
};

use super::AuthorizationError;
use super::cache::{CacheKey, RequestContext};
use super::policy::{self, SubmissionAuthorization};
use crate::config::LegacyScopeConfig;

/// Answers "which actions may the current user perform on this resource".
///
/// Lookups of granted actions on item resources are memoized in the
/// request's [`GrantCache`](super::GrantCache). Collection-level checks go
/// to the grant store directly.
#[derive(Clone)]
pub struct AuthorizationService {
    grants: Arc<dyn ResourceGrantClient>,
    legacy: LegacyScopeConfig,
}

impl AuthorizationService {
    #[must_use]
    pub fn new(grants: Arc<dyn ResourceGrantClient>, legacy: LegacyScopeConfig) -> Self {
        Self { grants, legacy }
    }

    async fn granted_action_names(
        &self,
        ctx: &RequestContext,
        resource_class: ResourceClass,
        resource_identifier: &str,
    ) -> Result<Arc<[String]>, AuthorizationError> {
        let key = CacheKey::new(
            resource_class,
            Some(resource_identifier),
            ctx.user_identifier(),
        );
        if let Some(hit) = ctx.cache().get(&key) {
            return Ok(hit);
        }

        let names: Arc<[String]> = self
            .grants
            .get_granted_actions(
                ctx.security(),
                resource_class.as_str(),
                Some(resource_identifier),
            )
            .await?
            .into();
        tracing::debug!(
            resource_class = %resource_class,
            resource_identifier,
            granted = names.len(),
            "fetched granted actions"
        );
        ctx.cache().insert(key, Arc::clone(&names));
        Ok(names)
    }

    async fn is_granted_on_collection(
        &self,
        ctx: &RequestContext,
        resource_class: ResourceClass,
        action: &str,
    ) -> Result<bool, AuthorizationError> {
        Ok(self
            .grants
            .is_current_user_granted_any_of(
                ctx.security(),
                resource_class.as_str(),
                None,
                &[action],
            )
            .await?)
    }

    // ---- forms ----

    /// Actions the current user holds on `form`, `manage` expanded.
    ///
    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn granted_form_actions(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<BTreeSet<FormAction>, AuthorizationError> {
        let names = self
            .granted_action_names(ctx, ResourceClass::Form, &form.identifier)
            .await?;
        let legacy = policy::legacy_form_actions(form, ctx.security(), &self.legacy);
        let mut actions = policy::expand_form_actions(policy::parse_actions(&names));
        actions.extend(legacy);
        Ok(actions)
    }

    /// Legacy client-scope rights are settled before the grant store is asked.
    async fn has_form_action(
        &self,
        ctx: &RequestContext,
        form: &Form,
        action: FormAction,
    ) -> Result<bool, AuthorizationError> {
        let legacy = policy::legacy_form_actions(form, ctx.security(), &self.legacy);
        if legacy.contains(&action) {
            return Ok(true);
        }
        Ok(self
            .granted_form_actions(ctx, form)
            .await?
            .contains(&action))
    }

    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn can_read_form(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<bool, AuthorizationError> {
        self.has_form_action(ctx, form, FormAction::Read).await
    }

    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn can_update_form(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<bool, AuthorizationError> {
        self.has_form_action(ctx, form, FormAction::Update).await
    }

    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn can_delete_form(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<bool, AuthorizationError> {
        self.has_form_action(ctx, form, FormAction::Delete).await
    }

    /// Item-level `create_submissions` on the form, including the legacy post scope.
    ///
    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn can_create_form_submissions(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<bool, AuthorizationError> {
        self.has_form_action(ctx, form, FormAction::CreateSubmissions)
            .await
    }

    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn can_read_form_submissions(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<bool, AuthorizationError> {
        self.has_form_action(ctx, form, FormAction::ReadSubmissions)
            .await
    }

    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn can_update_form_submissions(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<bool, AuthorizationError> {
        self.has_form_action(ctx, form, FormAction::UpdateSubmissions)
            .await
    }

    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn can_delete_form_submissions(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<bool, AuthorizationError> {
        self.has_form_action(ctx, form, FormAction::DeleteSubmissions)
            .await
    }

    /// Collection-level `create_forms`.
    ///
    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn can_create_forms(&self, ctx: &RequestContext) -> Result<bool, AuthorizationError> {
        self.is_granted_on_collection(
            ctx,
            ResourceClass::Form,
            FormCollectionAction::CreateForms.as_str(),
        )
        .await
    }

    /// Whether the current user may submit to `form` by any route: legacy
    /// post scope, `create_submissions` on the form, or the collection-level
    /// `create_submissions` on submissions.
    ///
    /// # Errors
    ///
    /// [`AuthorizationError::Infrastructure`] if the grant store fails.
    pub async fn can_create_submissions(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<bool, AuthorizationError> {
        if self.can_create_form_submissions(ctx, form).await? {
            return Ok(true);
        }
        self.is_granted_on_collection(
            ctx,
            ResourceClass::Submission,
            SubmissionCollectionAction::CreateSubmissions.as_str(),
        )
        .await
    }

    // ---- submissions ----

    /// Effective actions of the current user on `submission` of `form`.
    ///
    /// # Errors
    ///
    /// - [`AuthorizationError::Infrastructure`] if the grant store fails
    /// - [`AuthorizationError::InvalidConfiguration`] if `submission` does not
    ///   belong to `form` or the form's modes conflict
    pub async fn granted_actions_for(
        &self,
        ctx: &RequestContext,
        form: &Form,
        submission: &Submission,
    ) -> Result<BTreeSet<SubmissionAction>, AuthorizationError> {
        if submission.form_identifier != form.identifier {
            return Err(AuthorizationError::InvalidConfiguration(format!(
                "submission '{}' evaluated against foreign form '{}'",
                submission.identifier, form.identifier
            )));
        }
        let mode = SubmissionAuthorization::of(form)?;

        if let Some(legacy) =
            policy::legacy_submission_actions(form, ctx.security(), &self.legacy)
        {
            return Ok(legacy);
        }

        let form_names = self
            .granted_action_names(ctx, ResourceClass::Form, &form.identifier)
            .await?;
        let form_actions = policy::expand_form_actions(policy::parse_actions(&form_names));
        let mut granted = policy::submission_actions_from_form(&form_actions);

        if mode == SubmissionAuthorization::GrantBased {
            let names = self
                .granted_action_names(ctx, ResourceClass::Submission, &submission.identifier)
                .await?;
            granted.extend(policy::parse_actions::<SubmissionAction>(&names));
        }

        let effective = policy::effective_submission_actions(
            form,
            submission,
            mode,
            ctx.user_identifier(),
            &granted,
        );
        tracing::debug!(
            submission = %submission.identifier,
            state = %submission.submission_state,
            ?effective,
            "computed submission actions"
        );
        Ok(effective)
    }

    async fn has_submission_action(
        &self,
        ctx: &RequestContext,
        form: &Form,
        submission: &Submission,
        action: SubmissionAction,
    ) -> Result<bool, AuthorizationError> {
        Ok(self
            .granted_actions_for(ctx, form, submission)
            .await?
            .contains(&action))
    }

    /// # Errors
    ///
    /// See [`Self::granted_actions_for`].
    pub async fn can_read_submission(
        &self,
        ctx: &RequestContext,
        form: &Form,
        submission: &Submission,
    ) -> Result<bool, AuthorizationError> {
        self.has_submission_action(ctx, form, submission, SubmissionAction::Read)
            .await
    }

    /// # Errors
    ///
    /// See [`Self::granted_actions_for`].
    pub async fn can_update_submission(
        &self,
        ctx: &RequestContext,
        form: &Form,
        submission: &Submission,
    ) -> Result<bool, AuthorizationError> {
        self.has_submission_action(ctx, form, submission, SubmissionAction::Update)
            .await
    }

    /// # Errors
    ///
    /// See [`Self::granted_actions_for`].
    pub async fn can_delete_submission(
        &self,
        ctx: &RequestContext,
        form: &Form,
        submission: &Submission,
    ) -> Result<bool, AuthorizationError> {
        self.has_submission_action(ctx, form, submission, SubmissionAction::Delete)
            .await
    }

    /// # Errors
    ///
    /// See [`Self::granted_actions_for`].
    pub async fn can_write_submission_tags(
        &self,
        ctx: &RequestContext,
        form: &Form,
        submission: &Submission,
    ) -> Result<bool, AuthorizationError> {
        self.has_submission_action(ctx, form, submission, SubmissionAction::WriteTags)
            .await
    }
}
