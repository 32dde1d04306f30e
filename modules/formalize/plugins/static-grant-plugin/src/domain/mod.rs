//! Domain layer for the static grant store plugin.

mod client;
pub mod service;

pub use service::Service;
