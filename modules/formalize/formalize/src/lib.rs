//! Formalize Module
//!
//! CRUD services for dynamically defined forms and their submissions.
//! Every operation is authorized by the policy engine in [`domain::authz`],
//! which combines grants from the external resource grant store, creator
//! identity and submission-state gating. The grant lifecycle hooks in
//! [`domain::hooks`] keep the grant store consistent with resource lifecycle.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod infra;
pub mod module;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use config::{FormalizeConfig, LegacyScopeConfig};
pub use domain::authz::{AuthorizationError, AuthorizationService, GrantCache, RequestContext};
pub use domain::error::DomainError;
pub use domain::hooks::GrantLifecycleHooks;
pub use module::Formalize;
