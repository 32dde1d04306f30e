//! Grant lifecycle hooks.
//!
//! Every form and grant-based submission has a resource in the grant store.
//! These hooks create and drop those resources together with the domain
//! objects, and invalidate the request's cached lookups they affect.

use std::sync::Arc;

use formalize_sdk::{
    Form, FormAction, FormCollectionAction, GrantEventListener, GrantStoreError, GrantSubject,
    ResourceActionGrant, ResourceClass, ResourceGrantClient, ResourceHandle, Submission,
    SubmissionAction, SubmissionGrantAdded,
};
use parking_lot::RwLock;

use crate::domain::authz::RequestContext;

pub struct GrantLifecycleHooks {
    grants: Arc<dyn ResourceGrantClient>,
    listeners: RwLock<Vec<Arc<dyn GrantEventListener>>>,
}

impl GrantLifecycleHooks {
    #[must_use]
    pub fn new(grants: Arc<dyn ResourceGrantClient>) -> Self {
        Self {
            grants,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer for grants created on submissions.
    pub fn register_listener(&self, listener: Arc<dyn GrantEventListener>) {
        self.listeners.write().push(listener);
    }

    fn notify(&self, event: &SubmissionGrantAdded) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.on_submission_grant_added(event);
        }
    }

    async fn register_with_manage_grant(
        &self,
        resource_class: ResourceClass,
        resource_identifier: &str,
        manage: &str,
        creator_id: Option<&str>,
    ) -> Result<Option<ResourceActionGrant>, GrantStoreError> {
        let handle = self
            .grants
            .register_resource(resource_class.as_str(), Some(resource_identifier))
            .await?;
        let Some(creator) = creator_id else {
            return Ok(None);
        };
        let grant = self
            .grants
            .add_grant(&handle, manage, &GrantSubject::User(creator.to_owned()))
            .await?;
        Ok(Some(grant))
    }

    /// Register the form's resource and grant `manage` to its creator.
    ///
    /// # Errors
    ///
    /// Returns the grant store failure. Callers must undo the form creation.
    #[tracing::instrument(skip_all, fields(form = %form.identifier))]
    pub async fn on_form_created(
        &self,
        ctx: &RequestContext,
        form: &Form,
    ) -> Result<(), GrantStoreError> {
        self.register_with_manage_grant(
            ResourceClass::Form,
            &form.identifier,
            FormAction::Manage.as_str(),
            form.creator_id.as_deref(),
        )
        .await?;
        ctx.cache()
            .invalidate_resource(ResourceClass::Form, &form.identifier);
        tracing::info!("registered form resource");
        Ok(())
    }

    /// Register the submission's resource and grant `manage` to its creator,
    /// if the form uses grant-based submission authorization.
    ///
    /// Returns the grants created. Listeners are notified once per grant.
    ///
    /// # Errors
    ///
    /// Returns the grant store failure. Callers must undo the submission creation.
    #[tracing::instrument(
        skip_all,
        fields(form = %form.identifier, submission = %submission.identifier)
    )]
    pub async fn on_submission_created(
        &self,
        ctx: &RequestContext,
        form: &Form,
        submission: &Submission,
    ) -> Result<Vec<ResourceActionGrant>, GrantStoreError> {
        if !form.grant_based_submission_authorization {
            return Ok(Vec::new());
        }

        let grants: Vec<ResourceActionGrant> = self
            .register_with_manage_grant(
                ResourceClass::Submission,
                &submission.identifier,
                SubmissionAction::Manage.as_str(),
                submission.creator_id.as_deref(),
            )
            .await?
            .into_iter()
            .collect();
        ctx.cache()
            .invalidate_resource(ResourceClass::Submission, &submission.identifier);
        tracing::info!(grants = grants.len(), "registered submission resource");

        for grant in &grants {
            self.notify(&SubmissionGrantAdded {
                form_identifier: form.identifier.clone(),
                submission_identifier: submission.identifier.clone(),
                grant: grant.clone(),
            });
        }
        Ok(grants)
    }

    /// # Errors
    ///
    /// Returns the grant store failure.
    #[tracing::instrument(skip_all, fields(submission = %submission.identifier))]
    pub async fn on_submission_deleted(
        &self,
        ctx: &RequestContext,
        submission: &Submission,
    ) -> Result<(), GrantStoreError> {
        self.grants
            .remove_all_grants_for_resource(
                ResourceClass::Submission.as_str(),
                &submission.identifier,
            )
            .await?;
        ctx.cache()
            .invalidate_resource(ResourceClass::Submission, &submission.identifier);
        Ok(())
    }

    /// Drop the grants of every listed submission of a form in one call.
    ///
    /// # Errors
    ///
    /// Returns the grant store failure.
    #[tracing::instrument(
        skip_all,
        fields(form = form_identifier, submissions = submission_identifiers.len())
    )]
    pub async fn on_all_submissions_of_form_deleted(
        &self,
        ctx: &RequestContext,
        form_identifier: &str,
        submission_identifiers: &[String],
    ) -> Result<(), GrantStoreError> {
        if submission_identifiers.is_empty() {
            return Ok(());
        }
        self.grants
            .remove_all_grants_for_resources(
                ResourceClass::Submission.as_str(),
                submission_identifiers,
            )
            .await?;
        for identifier in submission_identifiers {
            ctx.cache()
                .invalidate_resource(ResourceClass::Submission, identifier);
        }
        tracing::info!("removed submission grants");
        Ok(())
    }

    /// Drop the grants of the form and of its submissions.
    ///
    /// # Errors
    ///
    /// Returns the grant store failure.
    pub async fn on_form_deleted(
        &self,
        ctx: &RequestContext,
        form: &Form,
        submission_identifiers: &[String],
    ) -> Result<(), GrantStoreError> {
        self.on_all_submissions_of_form_deleted(ctx, &form.identifier, submission_identifiers)
            .await?;
        self.grants
            .remove_all_grants_for_resource(ResourceClass::Form.as_str(), &form.identifier)
            .await?;
        ctx.cache()
            .invalidate_resource(ResourceClass::Form, &form.identifier);
        tracing::info!(form = %form.identifier, "removed form grants");
        Ok(())
    }

    /// Make sure the collection resources exist and grant `create_forms` to
    /// each of `groups`. Safe to run on every start.
    ///
    /// # Errors
    ///
    /// Returns the grant store failure.
    pub async fn bootstrap_form_creator_groups(
        &self,
        groups: &[String],
    ) -> Result<(), GrantStoreError> {
        let forms = self.ensure_collection(ResourceClass::Form).await?;
        self.ensure_collection(ResourceClass::Submission).await?;
        for group in groups {
            self.grants
                .add_grant(
                    &forms,
                    FormCollectionAction::CreateForms.as_str(),
                    &GrantSubject::Group(group.clone()),
                )
                .await?;
            tracing::info!(group = %group, "granted create_forms");
        }
        Ok(())
    }

    async fn ensure_collection(
        &self,
        resource_class: ResourceClass,
    ) -> Result<ResourceHandle, GrantStoreError> {
        let class = resource_class.as_str();
        if let Some(handle) = self.grants.find_resource(class, None).await? {
            return Ok(handle);
        }
        self.grants.register_resource(class, None).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::test_support::{
        CountingGrantStore, RecordingListener, form_fixture, submission_fixture,
    };
    use formalize_sdk::SubmissionState;
    use formalize_security::SecurityContext;

    fn ctx() -> RequestContext {
        RequestContext::new(SecurityContext::for_user("alice"))
    }

    #[tokio::test]
    async fn form_creation_grants_manage_to_creator() {
        let store = Arc::new(CountingGrantStore::default());
        let hooks = GrantLifecycleHooks::new(store.clone());
        let mut form = form_fixture("f1", false);
        form.creator_id = Some("alice".to_owned());

        hooks.on_form_created(&ctx(), &form).await.unwrap();

        assert_eq!(
            store.actions_of(
                ResourceClass::Form,
                Some("f1"),
                &GrantSubject::User("alice".to_owned())
            ),
            vec!["manage".to_owned()]
        );
    }

    #[tokio::test]
    async fn creator_less_form_is_registered_without_grant() {
        let store = Arc::new(CountingGrantStore::default());
        let hooks = GrantLifecycleHooks::new(store.clone());
        let mut form = form_fixture("f1", false);
        form.creator_id = None;

        hooks.on_form_created(&ctx(), &form).await.unwrap();

        assert!(store.is_registered(ResourceClass::Form, Some("f1")));
        assert_eq!(store.grant_count(), 0);
    }

    #[tokio::test]
    async fn grant_based_submission_notifies_listeners() {
        let store = Arc::new(CountingGrantStore::default());
        let hooks = GrantLifecycleHooks::new(store.clone());
        let listener = Arc::new(RecordingListener::default());
        hooks.register_listener(listener.clone());
        let form = form_fixture("f1", true);
        let submission = submission_fixture("s1", "f1", "alice", SubmissionState::Draft);

        let grants = hooks
            .on_submission_created(&ctx(), &form, &submission)
            .await
            .unwrap();

        assert_eq!(grants.len(), 1);
        let events = listener.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].submission_identifier, "s1");
        assert_eq!(events[0].grant.action, "manage");
    }

    #[tokio::test]
    async fn creator_based_submission_registers_nothing() {
        let store = Arc::new(CountingGrantStore::default());
        let hooks = GrantLifecycleHooks::new(store.clone());
        let form = form_fixture("f1", false);
        let submission = submission_fixture("s1", "f1", "alice", SubmissionState::Draft);

        let grants = hooks
            .on_submission_created(&ctx(), &form, &submission)
            .await
            .unwrap();

        assert!(grants.is_empty());
        assert!(!store.is_registered(ResourceClass::Submission, Some("s1")));
    }

    #[tokio::test]
    async fn form_deletion_cascades_to_submission_grants() {
        let store = Arc::new(CountingGrantStore::default());
        let hooks = GrantLifecycleHooks::new(store.clone());
        let form = form_fixture("f1", true);
        let ctx = ctx();
        hooks.on_form_created(&ctx, &form).await.unwrap();
        for id in ["s1", "s2"] {
            let submission = submission_fixture(id, "f1", "alice", SubmissionState::Submitted);
            hooks
                .on_submission_created(&ctx, &form, &submission)
                .await
                .unwrap();
        }

        hooks
            .on_form_deleted(&ctx, &form, &["s1".to_owned(), "s2".to_owned()])
            .await
            .unwrap();

        assert_eq!(store.grant_count(), 0);
        assert!(!store.is_registered(ResourceClass::Form, Some("f1")));
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let store = Arc::new(CountingGrantStore::default());
        let hooks = GrantLifecycleHooks::new(store.clone());
        let groups = vec!["editors".to_owned()];

        hooks.bootstrap_form_creator_groups(&groups).await.unwrap();
        hooks.bootstrap_form_creator_groups(&groups).await.unwrap();

        assert_eq!(
            store.actions_of(
                ResourceClass::Form,
                None,
                &GrantSubject::Group("editors".to_owned())
            ),
            vec!["create_forms".to_owned()]
        );
        assert!(store.is_registered(ResourceClass::Submission, None));
    }
}
