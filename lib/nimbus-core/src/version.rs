//! API version parsing and selection

use crate::error::VersionError;
use nimbus_api::VersionLink;
use std::fmt;
use std::str::FromStr;

/// A requested API version; `minor: None` asks for the highest minor of `major`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: Option<u32>,
}

impl ApiVersion {
    pub fn new(major: u32, minor: Option<u32>) -> Self {
        Self { major, minor }
    }

    /// Parse a URL path segment that names a version ("v2", "v2.1")
    ///
    /// Unlike [`FromStr`], the leading "v" is mandatory so that numeric
    /// identifiers in paths are not taken for versions.
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        let rest = segment
            .strip_prefix('v')
            .or_else(|| segment.strip_prefix('V'))?;
        rest.parse().ok()
    }

    fn matches(&self, link: &VersionLink) -> bool {
        link.major == self.major && self.minor.map_or(true, |minor| link.minor == minor)
    }
}

impl FromStr for ApiVersion {
    type Err = VersionError;

    /// Accepts `[v]MAJOR[.MINOR]` with a positive major
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::Invalid(s.to_string());
        let digits = s
            .strip_prefix('v')
            .or_else(|| s.strip_prefix('V'))
            .unwrap_or(s);

        let mut parts = digits.split('.');
        let major: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => Some(p.parse::<u32>().map_err(|_| invalid())?),
            None => None,
        };
        if parts.next().is_some() || major == 0 {
            return Err(invalid());
        }
        Ok(Self { major, minor })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "v{}.{}", self.major, minor),
            None => write!(f, "v{}", self.major),
        }
    }
}

/// Pick the version link best satisfying `requested`
///
/// With an explicit minor only that exact version qualifies; otherwise the
/// highest minor of the requested major wins.
pub fn select_version<'a>(
    versions: &'a [VersionLink],
    requested: ApiVersion,
    service_url: &str,
) -> Result<&'a VersionLink, VersionError> {
    versions
        .iter()
        .filter(|link| requested.matches(link))
        .max_by_key(|link| link.minor)
        .ok_or_else(|| VersionError::NotAvailable {
            requested: requested.to_string(),
            url: service_url.to_string(),
            available: versions.iter().map(|link| link.to_string()).collect(),
        })
}
