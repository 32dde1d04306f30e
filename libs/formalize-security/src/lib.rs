#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Request identity consumed by the formalize authorization engine.
//!
//! The [`SecurityContext`] is built once per request by the authentication
//! layer and passed through every domain call. It answers the three
//! questions the policy engine asks about the caller: who they are,
//! whether they are authenticated, and which (legacy) attributes they hold.

pub mod context;

pub use context::{SecurityContext, SecurityContextBuilder};
