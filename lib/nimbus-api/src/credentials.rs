//! Caller credentials and identity API selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identity API flavour used to obtain a token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMode {
    /// Username/password against identity API v2 (`/tokens`)
    #[default]
    #[serde(rename = "userpass")]
    UserPass,
    /// Username/password against identity API v3 (`/auth/tokens`)
    #[serde(rename = "userpass-v3")]
    UserPassV3,
}

impl AuthMode {
    /// Path appended to the identity URL to request a token
    pub fn token_path(&self) -> &'static str {
        match self {
            AuthMode::UserPass => "/tokens",
            AuthMode::UserPassV3 => "/auth/tokens",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::UserPass => "userpass",
            AuthMode::UserPassV3 => "userpass-v3",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown auth mode: {0}")]
pub struct ParseAuthModeError(pub String);

impl FromStr for AuthMode {
    type Err = ParseAuthModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "userpass" | "v2" => Ok(AuthMode::UserPass),
            "userpass-v3" | "userpassv3" | "v3" => Ok(AuthMode::UserPassV3),
            other => Err(ParseAuthModeError(other.to_string())),
        }
    }
}

/// Long-lived credentials used to authenticate against the identity service
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Identity service URL
    pub url: String,
    /// User name
    pub user: String,
    /// Password or other secret
    pub secrets: String,
    /// Region the client operates in, most specific first (e.g. "az-1.region-a.geo-1")
    pub region: String,
    /// Tenant (project) to scope the token to
    pub tenant_name: String,
    /// Identity domain for v3 authentication; empty means "default"
    pub domain: String,
}

impl Credentials {
    /// Domain name to send with v3 requests
    pub fn domain_or_default(&self) -> &str {
        if self.domain.is_empty() {
            "default"
        } else {
            &self.domain
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("secrets", &"<redacted>")
            .field("region", &self.region)
            .field("tenant_name", &self.tenant_name)
            .field("domain", &self.domain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_from_str() {
        assert_eq!("userpass".parse::<AuthMode>(), Ok(AuthMode::UserPass));
        assert_eq!("USERPASS-V3".parse::<AuthMode>(), Ok(AuthMode::UserPassV3));
        assert_eq!("v3".parse::<AuthMode>(), Ok(AuthMode::UserPassV3));
        assert!("keypair".parse::<AuthMode>().is_err());
    }

    #[test]
    fn test_auth_mode_serde_names_match_display() {
        for mode in [AuthMode::UserPass, AuthMode::UserPassV3] {
            let encoded = serde_json::to_string(&mode).unwrap();
            assert_eq!(encoded, format!("\"{}\"", mode));
            assert_eq!(serde_json::from_str::<AuthMode>(&encoded).unwrap(), mode);
        }
        assert_eq!(
            serde_json::from_str::<AuthMode>("\"userpass-v3\"").unwrap(),
            AuthMode::UserPassV3
        );
        assert!(serde_json::from_str::<AuthMode>("\"user-pass\"").is_err());
    }

    #[test]
    fn test_token_path() {
        assert_eq!(AuthMode::UserPass.token_path(), "/tokens");
        assert_eq!(AuthMode::UserPassV3.token_path(), "/auth/tokens");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials {
            url: "http://identity".to_string(),
            user: "joe".to_string(),
            secrets: "hunter2".to_string(),
            region: "region-a".to_string(),
            ..Default::default()
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("joe"));
    }

    #[test]
    fn test_domain_default() {
        let mut creds = Credentials::default();
        assert_eq!(creds.domain_or_default(), "default");
        creds.domain = "corp".to_string();
        assert_eq!(creds.domain_or_default(), "corp");
    }
}
