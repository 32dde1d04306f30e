//! Configuration for the static grant store plugin.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticGrantPluginConfig {
    /// Dynamic group name to the user attribute whose truthiness decides
    /// membership.
    pub dynamic_groups: BTreeMap<String, String>,
}

impl StaticGrantPluginConfig {
    #[must_use]
    pub fn with_dynamic_group(
        mut self,
        group: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        self.dynamic_groups.insert(group.into(), attribute.into());
        self
    }
}
