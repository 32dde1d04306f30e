//! Authorization policy engine.
//!
//! [`policy`] holds the pure decision rules. [`AuthorizationService`] feeds
//! them with grants fetched from the resource grant store, memoized per
//! request in a [`GrantCache`].

mod cache;
pub mod policy;
mod service;

pub use cache::{CacheKey, GrantCache, RequestContext};
pub use service::AuthorizationService;

use formalize_sdk::GrantStoreError;
use thiserror::Error;

/// Failure to compute a decision. Denial is not an error of the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The grant store could not be consulted.
    #[error("cannot determine access: {0}")]
    Infrastructure(#[from] GrantStoreError),

    #[error("invalid authorization configuration: {0}")]
    InvalidConfiguration(String),
}
