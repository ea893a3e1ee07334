//! Client configuration

use crate::tls::TlsClientConfig;
use nimbus_core::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Service types a client requires unless told otherwise
pub const DEFAULT_REQUIRED_SERVICE_TYPES: &[&str] = &["compute", "object-store"];

/// Settings for an authenticating client and its HTTP transport
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Upper bound on a single authentication attempt, in seconds
    pub auth_timeout_secs: u64,
    /// Per-request timeout of the HTTP transport, in seconds
    pub request_timeout_secs: u64,
    /// Service types that must be reachable in the configured region
    pub required_service_types: Vec<String>,
    /// Resolve requested API versions through version discovery
    pub version_discovery: bool,
    /// PEM CA bundle to trust in addition to the system roots
    pub ca_cert_file: Option<PathBuf>,
    /// Whether to verify server certificates
    pub verify_server_cert: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_timeout_secs: 60,
            request_timeout_secs: 60,
            required_service_types: DEFAULT_REQUIRED_SERVICE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            version_discovery: true,
            ca_cert_file: None,
            verify_server_cert: true,
        }
    }
}

impl ClientConfig {
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject settings no client can work with
    pub fn validate(&self) -> Result<()> {
        if self.auth_timeout_secs == 0 {
            return Err(ClientError::InvalidConfiguration(
                "auth_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the transport needs settings beyond the defaults
    pub fn has_custom_tls(&self) -> bool {
        self.ca_cert_file.is_some() || !self.verify_server_cert
    }

    /// TLS settings, reading the CA bundle from disk when one is configured
    pub fn tls_config(&self) -> Result<TlsClientConfig> {
        match &self.ca_cert_file {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    ClientError::InvalidConfiguration(format!(
                        "cannot read CA bundle {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                TlsClientConfig::from_pem(pem, self.verify_server_cert)
            }
            None => Ok(TlsClientConfig::new(None, self.verify_server_cert)),
        }
    }
}
