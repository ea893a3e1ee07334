//! Core authentication and endpoint resolution logic
//!
//! This library provides:
//! - Hierarchical region matching and alternate region suggestions
//! - Service catalog derivation for the configured region
//! - API version parsing and best-version selection
//! - The error taxonomy shared by the client crates

pub mod catalog;
pub mod error;
pub mod region;
pub mod version;

pub use catalog::{make_url, ServiceCatalog};
pub use error::{CatalogError, ClientError, Result, VersionError};
pub use region::{region_matches, suggest_regions};
pub use version::{select_version, ApiVersion};
