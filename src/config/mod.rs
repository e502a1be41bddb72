//! Server configuration: types and the environment loader.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;
