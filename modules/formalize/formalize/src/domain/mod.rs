//! Domain layer for the formalize module.
//!
//! - [`authz`] - authorization policy engine and per-request grant cache
//! - [`hooks`] - keeps the resource grant store in sync with resource lifecycle
//! - [`service`] - form and submission lifecycle services
//! - [`repo`] - persistence ports
//! - [`local_client`] - in-process implementation of the public SDK trait

pub mod authz;
pub mod error;
pub mod hooks;
pub mod local_client;
pub mod repo;
pub mod service;

pub use error::DomainError;
pub use local_client::FormalizeLocalClient;
