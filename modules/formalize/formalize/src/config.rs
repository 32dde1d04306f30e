//! Configuration for the formalize module.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Environment variable prefix; `__` separates nested keys.
pub const ENV_PREFIX: &str = "FORMALIZE__";

/// Module configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormalizeConfig {
    /// Used for new forms that do not specify a limit. 0 means unlimited.
    pub default_max_num_submissions_per_creator: u32,

    /// Static groups granted the collection-level `create_forms` action at startup.
    pub form_creator_groups: Vec<String>,

    /// Attribute names for the deprecated client-scope authorization.
    pub legacy: LegacyScopeConfig,

    /// Default `tracing` filter directive when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for FormalizeConfig {
    fn default() -> Self {
        Self {
            default_max_num_submissions_per_creator: 10,
            form_creator_groups: Vec::new(),
            legacy: LegacyScopeConfig::default(),
            log_filter: "info".to_owned(),
        }
    }
}

/// User attributes consulted for forms using the legacy client-scope mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegacyScopeConfig {
    /// Any of these grants `read_submissions`.
    pub read_submissions_attributes: Vec<String>,
    /// Any of these grants `create_submissions`.
    pub create_submissions_attributes: Vec<String>,
}

impl Default for LegacyScopeConfig {
    fn default() -> Self {
        Self {
            read_submissions_attributes: vec![
                "SCOPE_FORMALIZE".to_owned(),
                "ROLE_FORMALIZE_TEST_USER".to_owned(),
            ],
            create_submissions_attributes: vec!["SCOPE_FORMALIZE_POST".to_owned()],
        }
    }
}

impl FormalizeConfig {
    /// Load defaults, then the optional YAML file, then `FORMALIZE__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let cfg = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(cfg)
    }
}
