//! Static grant store plugin module.

use std::sync::Arc;

use formalize_sdk::ResourceGrantClient;
use tracing::info;

use crate::config::StaticGrantPluginConfig;
use crate::domain::Service;

pub struct StaticGrantPlugin {
    service: Arc<Service>,
}

impl StaticGrantPlugin {
    #[must_use]
    pub fn init(cfg: StaticGrantPluginConfig) -> Self {
        info!(
            dynamic_groups = cfg.dynamic_groups.len(),
            "Initializing static_grant_plugin"
        );
        Self {
            service: Arc::new(Service::new(cfg)),
        }
    }

    /// The store as seen by the formalize module.
    #[must_use]
    pub fn client(&self) -> Arc<dyn ResourceGrantClient> {
        self.service.clone()
    }

    /// Direct access for inspection and test hooks.
    #[must_use]
    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }
}
