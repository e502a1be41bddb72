//! HTTP handlers: generic resource operations and the student routes built on them.

pub mod resource;
pub mod student;
pub use resource::ResourceHooks;
