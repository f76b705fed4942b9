//! Query composition: static identifiers from resource specs, request values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
