//! Versioned endpoints published by a service

use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete API version served at `url`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLink {
    pub major: u32,
    pub minor: u32,
    pub url: String,
}

impl VersionLink {
    pub fn new(major: u32, minor: u32, url: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            url: url.into(),
        }
    }
}

impl fmt::Display for VersionLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}
