//! Nimbus API types shared by the identity client and its collaborators
//!
//! This library defines the data exchanged with the platform:
//! - Credentials and AuthMode: what a caller authenticates with
//! - AuthDetails: the result of one authentication cycle, including the catalog
//! - AuthOption: identity API versions advertised by the identity service
//! - RequestData: request/response payload handed to a transport
//! - VersionLink: one concrete API version published by a service

pub mod auth;
pub mod credentials;
pub mod request;
pub mod version;

pub use auth::{AuthDetails, AuthOption, AuthOptions, RegionServiceUrls, ServiceUrls};
pub use credentials::{AuthMode, Credentials, ParseAuthModeError};
pub use request::{Method, RequestData};
pub use version::VersionLink;
