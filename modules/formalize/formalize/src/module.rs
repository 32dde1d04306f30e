//! Formalize module wiring.

use std::sync::Arc;

use anyhow::Context;
use formalize_sdk::{BlobFileClient, FormalizeClient, GrantEventListener, ResourceGrantClient};
use tracing::info;

use crate::config::FormalizeConfig;
use crate::domain::authz::AuthorizationService;
use crate::domain::hooks::GrantLifecycleHooks;
use crate::domain::repo::{FormsRepository, SubmissionsRepository};
use crate::domain::service::{AppServices, Deps, ServiceConfig};
use crate::domain::FormalizeLocalClient;
use crate::infra::storage::{InMemoryForms, InMemorySubmissions};

/// Formalize module.
///
/// On init it:
/// 1. Ensures the collection resources exist in the grant store
/// 2. Grants `create_forms` to the configured form creator groups
/// 3. Builds the services and the local [`FormalizeClient`]
pub struct Formalize {
    services: AppServices,
    authz: AuthorizationService,
    hooks: Arc<GrantLifecycleHooks>,
    client: Arc<dyn FormalizeClient>,
}

impl Formalize {
    pub const MODULE_NAME: &'static str = "formalize";

    /// Initialize with in-memory repositories.
    ///
    /// # Errors
    ///
    /// Fails if bootstrapping the grant store fails.
    pub async fn init(
        config: &FormalizeConfig,
        grants: Arc<dyn ResourceGrantClient>,
        blobs: Arc<dyn BlobFileClient>,
    ) -> anyhow::Result<Self> {
        Self::init_with_repositories(
            config,
            grants,
            blobs,
            Arc::new(InMemoryForms::new()),
            Arc::new(InMemorySubmissions::new()),
        )
        .await
    }

    /// # Errors
    ///
    /// Fails if bootstrapping the grant store fails.
    #[tracing::instrument(skip_all, fields(form_creator_groups = config.form_creator_groups.len()))]
    pub async fn init_with_repositories(
        config: &FormalizeConfig,
        grants: Arc<dyn ResourceGrantClient>,
        blobs: Arc<dyn BlobFileClient>,
        forms: Arc<dyn FormsRepository>,
        submissions: Arc<dyn SubmissionsRepository>,
    ) -> anyhow::Result<Self> {
        info!("Initializing {} module", Self::MODULE_NAME);

        let hooks = Arc::new(GrantLifecycleHooks::new(Arc::clone(&grants)));
        hooks
            .bootstrap_form_creator_groups(&config.form_creator_groups)
            .await
            .context("failed to bootstrap form creator grants")?;

        let authz = AuthorizationService::new(grants, config.legacy.clone());
        let services = AppServices::new(Deps {
            authz: authz.clone(),
            hooks: Arc::clone(&hooks),
            forms,
            submissions,
            blobs,
            config: ServiceConfig {
                default_max_num_submissions_per_creator: config
                    .default_max_num_submissions_per_creator,
            },
        });
        let client: Arc<dyn FormalizeClient> =
            Arc::new(FormalizeLocalClient::new(services.clone()));

        info!("{} module initialized successfully", Self::MODULE_NAME);
        Ok(Self {
            services,
            authz,
            hooks,
            client,
        })
    }

    /// Public API of the module.
    #[must_use]
    pub fn client(&self) -> Arc<dyn FormalizeClient> {
        Arc::clone(&self.client)
    }

    #[must_use]
    pub fn services(&self) -> &AppServices {
        &self.services
    }

    #[must_use]
    pub fn authorization(&self) -> &AuthorizationService {
        &self.authz
    }

    /// Observe grants created on submissions.
    pub fn register_grant_listener(&self, listener: Arc<dyn GrantEventListener>) {
        self.hooks.register_listener(listener);
    }
}
