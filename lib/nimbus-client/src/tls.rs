//! TLS settings for outbound connections to the identity service and endpoints

use nimbus_core::{ClientError, Result};
use rustls::pki_types::CertificateDer;
use rustls_pemfile::certs;
use std::io::BufReader;
use tracing::debug;

/// TLS configuration for the HTTP transport
#[derive(Clone, Debug, PartialEq)]
pub struct TlsClientConfig {
    /// Optional PEM-encoded CA bundle trusted in addition to the system roots
    pub ca_cert_pem: Option<Vec<u8>>,
    /// Whether to verify the server certificate
    pub verify_server_cert: bool,
}

impl Default for TlsClientConfig {
    fn default() -> Self {
        Self {
            ca_cert_pem: None,
            verify_server_cert: true,
        }
    }
}

impl TlsClientConfig {
    /// Create a new TLS client configuration
    pub fn new(ca_cert_pem: Option<Vec<u8>>, verify_server_cert: bool) -> Self {
        Self {
            ca_cert_pem,
            verify_server_cert,
        }
    }

    /// Configuration that accepts any server certificate
    pub fn non_validating() -> Self {
        Self::new(None, false)
    }

    /// Load TLS client configuration from a PEM CA bundle, validating its format
    pub fn from_pem(ca_cert_pem: Vec<u8>, verify_server_cert: bool) -> Result<Self> {
        let count = load_certificates(&ca_cert_pem)?.len();
        if count == 0 {
            return Err(ClientError::InvalidConfiguration(
                "no CA certificates found in PEM data".to_string(),
            ));
        }
        debug!("Loaded {} CA certificate(s)", count);

        Ok(Self {
            ca_cert_pem: Some(ca_cert_pem),
            verify_server_cert,
        })
    }

    /// DER-encoded CA certificates from the configured bundle
    pub fn ca_certificates(&self) -> Result<Vec<CertificateDer<'static>>> {
        match &self.ca_cert_pem {
            Some(pem) => load_certificates(pem),
            None => Ok(Vec::new()),
        }
    }
}

/// Load certificates from PEM-encoded data
pub fn load_certificates(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(pem_data);
    certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ClientError::InvalidConfiguration(format!("failed to parse certificates: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_verifies() {
        let config = TlsClientConfig::default();
        assert!(config.verify_server_cert);
        assert_eq!(config.ca_cert_pem, None);
    }

    #[test]
    fn test_non_validating() {
        let config = TlsClientConfig::non_validating();
        assert!(!config.verify_server_cert);
    }

    #[test]
    fn test_from_pem_rejects_empty_bundle() {
        let err = TlsClientConfig::from_pem(b"not a certificate".to_vec(), true).unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_ca_certificates_without_bundle() {
        let config = TlsClientConfig::new(None, true);
        assert!(config.ca_certificates().unwrap().is_empty());
    }
}
