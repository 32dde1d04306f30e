//! Repository implementations.

mod memory;

pub use memory::{InMemoryForms, InMemorySubmissions};
