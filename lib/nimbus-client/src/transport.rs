//! HTTP dispatch for identity and service requests

use crate::config::ClientConfig;
use crate::tls::TlsClientConfig;
use async_trait::async_trait;
use nimbus_api::{Method, RequestData};
use nimbus_core::{ClientError, Result};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, debug_span, Instrument};

/// Header carrying the token on authenticated requests
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Default per-request timeout of [`HttpTransport`]
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sends one request; an empty `token` sends the request unauthenticated
///
/// A 401 response must surface as [`ClientError::Unauthorized`] so that callers can
/// tell a rejected token apart from other failures.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        url: &str,
        token: &str,
        data: &mut RequestData,
    ) -> Result<()>;
}

static SHARED: OnceLock<Arc<HttpTransport>> = OnceLock::new();

/// reqwest-backed transport with connection pooling
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
    /// Optional TLS configuration for HTTPS requests
    tls_config: Option<Arc<TlsClientConfig>>,
}

impl HttpTransport {
    /// Create a transport using the system trust roots
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Internal(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            tls_config: None,
        })
    }

    /// Create a transport with a custom CA bundle or disabled certificate checks
    pub fn with_tls(timeout: Duration, tls_config: TlsClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!tls_config.verify_server_cert);

        for cert in tls_config.ca_certificates()? {
            let cert = reqwest::Certificate::from_der(cert.as_ref()).map_err(|e| {
                ClientError::InvalidConfiguration(format!("invalid CA certificate: {}", e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Internal(format!("cannot build HTTP client: {}", e)))?;

        debug!(
            "HttpTransport initialized with TLS settings (server cert verification: {})",
            tls_config.verify_server_cert
        );

        Ok(Self {
            client,
            timeout,
            tls_config: Some(Arc::new(tls_config)),
        })
    }

    /// Transport that skips server certificate verification
    pub fn non_validating(timeout: Duration) -> Result<Self> {
        Self::with_tls(timeout, TlsClientConfig::non_validating())
    }

    /// Transport honouring the timeout and TLS settings of `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        if config.has_custom_tls() {
            Self::with_tls(config.request_timeout(), config.tls_config()?)
        } else {
            Self::new(config.request_timeout())
        }
    }

    /// Process-wide transport for callers that want to share one connection pool
    pub fn shared() -> Result<Arc<HttpTransport>> {
        if let Some(transport) = SHARED.get() {
            return Ok(transport.clone());
        }
        let transport = Arc::new(Self::new(DEFAULT_REQUEST_TIMEOUT)?);
        Ok(SHARED.get_or_init(|| transport).clone())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the TLS configuration if set
    pub fn tls_config(&self) -> Option<&TlsClientConfig> {
        self.tls_config.as_ref().map(|arc| arc.as_ref())
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        data: &mut RequestData,
    ) -> Result<()> {
        let transport_error = |e: reqwest::Error| ClientError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let http_method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| ClientError::Internal(format!("invalid method {}: {}", method, e)))?;
        let mut builder = self.client.request(http_method, url);
        if !token.is_empty() {
            builder = builder.header(AUTH_TOKEN_HEADER, token);
        }
        for (name, value) in &data.req_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !data.params.is_empty() {
            builder = builder.query(&data.params);
        }
        if data.is_json() {
            builder = builder.header(reqwest::header::ACCEPT, "application/json");
            if let Some(value) = &data.req_value {
                builder = builder.json(value);
            }
        } else if let Some(body) = &data.req_body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        data.resp_status = status;
        data.resp_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!("Response status {} ({} bytes)", status, body.len());

        if status == 401 {
            return Err(ClientError::Unauthorized {
                url: url.to_string(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        if !data.accepts_status(status) {
            return Err(ClientError::Http {
                status,
                url: url.to_string(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        data.resp_value = if data.json_response && !body.is_empty() {
            Some(serde_json::from_slice(&body)?)
        } else {
            None
        };
        data.resp_body = body.to_vec();
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        url: &str,
        token: &str,
        data: &mut RequestData,
    ) -> Result<()> {
        let span = debug_span!("http_request", method = %method, url = %url);
        self.send(method, url, token, data).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let transport = HttpTransport::new(Duration::from_secs(30)).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(30));
        assert!(transport.tls_config().is_none());
    }

    #[test]
    fn test_transport_non_validating() {
        let transport = HttpTransport::non_validating(Duration::from_secs(5)).unwrap();
        let config = transport.tls_config().expect("TLS config should be present");
        assert!(!config.verify_server_cert);
    }

    #[test]
    fn test_shared_transport_is_reused() {
        let a = HttpTransport::shared().unwrap();
        let b = HttpTransport::shared().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
