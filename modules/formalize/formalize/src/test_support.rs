//! Test doubles and fixtures shared by the unit tests.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use formalize_sdk::{
    BlobFileClient, BlobStoreError, FileMetadata, Form, GrantEventListener, GrantStoreError,
    GrantSubject, LocalizedName, ResourceActionGrant, ResourceClass, ResourceGrantClient,
    ResourceHandle, Submission, SubmissionGrantAdded, SubmissionState, SubmissionStates,
    TagPermissions,
};
use formalize_security::SecurityContext;
use parking_lot::Mutex;
use static_grant_plugin::{Service as StaticGrants, StaticGrantPluginConfig};
use time::OffsetDateTime;

use crate::config::LegacyScopeConfig;
use crate::domain::authz::AuthorizationService;
use crate::domain::hooks::GrantLifecycleHooks;
use crate::domain::repo::{FormsRepository, SubmissionsRepository};
use crate::domain::service::{AppServices, Deps, ServiceConfig};
use crate::infra::storage::{InMemoryForms, InMemorySubmissions};

pub fn form_fixture(identifier: &str, grant_based: bool) -> Form {
    Form {
        identifier: identifier.to_owned(),
        name: LocalizedName::new("Survey"),
        data_feed_schema: None,
        creator_id: Some("owner".to_owned()),
        date_created: OffsetDateTime::UNIX_EPOCH,
        grant_based_submission_authorization: grant_based,
        legacy_client_scope_authorization: false,
        allowed_submission_states: SubmissionStates::ALL,
        actions_allowed_when_submitted: BTreeSet::new(),
        max_num_submissions_per_creator: 10,
        available_tags: Vec::new(),
        tag_permissions_for_submitters: TagPermissions::None,
    }
}

pub fn submission_fixture(
    identifier: &str,
    form: &str,
    creator: &str,
    state: SubmissionState,
) -> Submission {
    Submission {
        identifier: identifier.to_owned(),
        form_identifier: form.to_owned(),
        data_feed_element: Some("{}".to_owned()),
        submission_state: state,
        creator_id: Some(creator.to_owned()),
        last_modified_by_id: Some(creator.to_owned()),
        date_created: OffsetDateTime::UNIX_EPOCH,
        date_last_modified: OffsetDateTime::UNIX_EPOCH,
        tags: BTreeSet::new(),
        granted_actions: None,
    }
}

/// Static grant store that counts lookups and can be made to fail.
pub struct CountingGrantStore {
    inner: StaticGrants,
    lookups: AtomicUsize,
    failure: Mutex<Option<GrantStoreError>>,
    registration_failure: Mutex<Option<GrantStoreError>>,
    grant_failure: Mutex<Option<GrantStoreError>>,
}

impl Default for CountingGrantStore {
    fn default() -> Self {
        Self {
            inner: StaticGrants::new(StaticGrantPluginConfig::default()),
            lookups: AtomicUsize::new(0),
            failure: Mutex::new(None),
            registration_failure: Mutex::new(None),
            grant_failure: Mutex::new(None),
        }
    }
}

impl CountingGrantStore {
    /// Fail every call from now on.
    pub fn fail_with(&self, error: GrantStoreError) {
        *self.failure.lock() = Some(error);
    }

    /// Fail resource registration and grant creation only.
    pub fn fail_registration_with(&self, error: GrantStoreError) {
        *self.registration_failure.lock() = Some(error);
    }

    /// Fail grant creation only; resources still register.
    pub fn fail_grants_with(&self, error: GrantStoreError) {
        *self.grant_failure.lock() = Some(error);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), GrantStoreError> {
        self.failure.lock().clone().map_or(Ok(()), Err)
    }

    fn check_registration(&self) -> Result<(), GrantStoreError> {
        self.check()?;
        self.registration_failure.lock().clone().map_or(Ok(()), Err)
    }

    fn check_grant(&self) -> Result<(), GrantStoreError> {
        self.check_registration()?;
        self.grant_failure.lock().clone().map_or(Ok(()), Err)
    }

    fn handle(&self, class: ResourceClass, id: Option<&str>) -> ResourceHandle {
        match self.inner.find(class.as_str(), id) {
            Ok(Some(handle)) => handle,
            _ => self.inner.register(class.as_str(), id).unwrap(),
        }
    }

    /// Seed a grant, bypassing failure injection.
    pub fn grant(&self, class: ResourceClass, id: &str, action: &str, subject: GrantSubject) {
        let handle = self.handle(class, Some(id));
        self.inner.add_grant(&handle, action, &subject).unwrap();
    }

    pub fn grant_collection(&self, class: ResourceClass, action: &str, subject: GrantSubject) {
        let handle = self.handle(class, None);
        self.inner.add_grant(&handle, action, &subject).unwrap();
    }

    pub fn actions_of(
        &self,
        class: ResourceClass,
        id: Option<&str>,
        subject: &GrantSubject,
    ) -> Vec<String> {
        self.inner
            .grants_on(class.as_str(), id)
            .into_iter()
            .filter(|g| &g.subject == subject)
            .map(|g| g.action)
            .collect()
    }

    pub fn is_registered(&self, class: ResourceClass, id: Option<&str>) -> bool {
        self.inner.is_registered(class.as_str(), id)
    }

    pub fn grant_count(&self) -> usize {
        self.inner.grant_count()
    }

    pub fn resource_count(&self) -> usize {
        self.inner.resource_count()
    }
}

#[async_trait]
impl ResourceGrantClient for CountingGrantStore {
    async fn is_current_user_granted_any_of(
        &self,
        ctx: &SecurityContext,
        resource_class: &str,
        resource_identifier: Option<&str>,
        actions: &[&str],
    ) -> Result<bool, GrantStoreError> {
        self.check()?;
        self.inner
            .is_current_user_granted_any_of(ctx, resource_class, resource_identifier, actions)
            .await
    }

    async fn get_granted_actions(
        &self,
        ctx: &SecurityContext,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<Vec<String>, GrantStoreError> {
        self.check()?;
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner
            .get_granted_actions(ctx, resource_class, resource_identifier)
            .await
    }

    async fn find_resource(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<Option<ResourceHandle>, GrantStoreError> {
        self.check()?;
        self.inner
            .find_resource(resource_class, resource_identifier)
            .await
    }

    async fn register_resource(
        &self,
        resource_class: &str,
        resource_identifier: Option<&str>,
    ) -> Result<ResourceHandle, GrantStoreError> {
        self.check_registration()?;
        self.inner
            .register_resource(resource_class, resource_identifier)
            .await
    }

    async fn add_grant(
        &self,
        resource: &ResourceHandle,
        action: &str,
        subject: &GrantSubject,
    ) -> Result<ResourceActionGrant, GrantStoreError> {
        self.check_grant()?;
        ResourceGrantClient::add_grant(&self.inner, resource, action, subject).await
    }

    async fn remove_all_grants_for_resource(
        &self,
        resource_class: &str,
        resource_identifier: &str,
    ) -> Result<(), GrantStoreError> {
        self.check()?;
        self.inner
            .remove_all_grants_for_resource(resource_class, resource_identifier)
            .await
    }

    async fn remove_all_grants_for_resources(
        &self,
        resource_class: &str,
        resource_identifiers: &[String],
    ) -> Result<(), GrantStoreError> {
        self.check()?;
        self.inner
            .remove_all_grants_for_resources(resource_class, resource_identifiers)
            .await
    }
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<SubmissionGrantAdded>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<SubmissionGrantAdded> {
        self.events.lock().clone()
    }
}

impl GrantEventListener for RecordingListener {
    fn on_submission_grant_added(&self, event: &SubmissionGrantAdded) {
        self.events.lock().push(event.clone());
    }
}

/// Blob store that knows every file except those named `missing*`.
#[derive(Default)]
pub struct FakeBlobs {
    removed: Mutex<Vec<String>>,
}

impl FakeBlobs {
    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl BlobFileClient for FakeBlobs {
    async fn file_metadata(
        &self,
        file_data_identifier: &str,
    ) -> Result<FileMetadata, BlobStoreError> {
        if file_data_identifier.starts_with("missing") {
            return Err(BlobStoreError::NotFound(file_data_identifier.to_owned()));
        }
        Ok(FileMetadata {
            file_name: format!("{file_data_identifier}.pdf"),
            file_size: 1024,
            mime_type: "application/pdf".to_owned(),
        })
    }

    async fn remove_file(&self, file_data_identifier: &str) -> Result<(), BlobStoreError> {
        self.removed.lock().push(file_data_identifier.to_owned());
        Ok(())
    }
}

/// Services over in-memory collaborators.
pub struct Harness {
    pub services: AppServices,
    pub grants: Arc<CountingGrantStore>,
    pub forms: Arc<dyn FormsRepository>,
    pub submissions: Arc<dyn SubmissionsRepository>,
    pub blobs: Arc<FakeBlobs>,
}

impl Harness {
    pub fn new() -> Self {
        let grants = Arc::new(CountingGrantStore::default());
        let forms: Arc<dyn FormsRepository> = Arc::new(InMemoryForms::new());
        let submissions: Arc<dyn SubmissionsRepository> = Arc::new(InMemorySubmissions::new());
        let blobs = Arc::new(FakeBlobs::default());
        let services = AppServices::new(Deps {
            authz: AuthorizationService::new(grants.clone(), LegacyScopeConfig::default()),
            hooks: Arc::new(GrantLifecycleHooks::new(grants.clone())),
            forms: Arc::clone(&forms),
            submissions: Arc::clone(&submissions),
            blobs: blobs.clone(),
            config: ServiceConfig::default(),
        });
        Self {
            services,
            grants,
            forms,
            submissions,
            blobs,
        }
    }

    pub fn allow_form_creation(&self, group: &str) {
        self.grants.grant_collection(
            ResourceClass::Form,
            "create_forms",
            GrantSubject::Group(group.to_owned()),
        );
    }

    pub fn allow_submitting(&self, users: &[&str]) {
        for user in users {
            self.grants.grant_collection(
                ResourceClass::Submission,
                "create_submissions",
                GrantSubject::User((*user).to_owned()),
            );
        }
    }
}
