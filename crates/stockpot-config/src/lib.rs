//! Parse and validate `stockpot.toml`.

pub mod linktype;
pub mod manifest;

pub use linktype::LinkType;
pub use manifest::{DependencyDefaults, Manifest};
