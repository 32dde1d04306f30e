#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static Resource Grant Store Plugin
//!
//! Keeps resources and their `(action, subject)` grants in memory.
//!
//! ## Subjects
//!
//! - `user` matches the authenticated user identifier
//! - `group` matches the static groups of the security context
//! - `dynamic_group` matches users holding the attribute configured for
//!   the group
//!
//! ## Configuration
//!
//! ```yaml
//! static_grant_plugin:
//!   dynamic_groups:
//!     employees: ROLE_EMPLOYEE
//! ```

pub mod config;
pub mod domain;
pub mod module;

pub use config::StaticGrantPluginConfig;
pub use domain::Service;
pub use module::StaticGrantPlugin;
