//! Safe SQL builder: identifiers from resource metadata only, values as parameters.

mod builder;
mod filter;
pub mod params;
pub use builder::*;
pub use filter::*;
pub use params::*;
