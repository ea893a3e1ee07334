//! Authenticating client for Nimbus platform services
//!
//! This library provides:
//! - PublicClient and AuthenticatingClient behind the Client trait
//! - Identity v2 and v3 password authenticators
//! - API version discovery and negotiation for catalog URLs
//! - A reqwest-backed transport with optional custom TLS trust
//! - Prometheus metrics for authentication and request activity

pub mod client;
pub mod config;
pub mod discovery;
pub mod identity;
pub mod metrics;
pub mod negotiator;
pub mod tls;
pub mod transport;

pub use client::{AuthenticatingClient, Client, ClientBuilder, PublicClient};
pub use config::ClientConfig;
pub use discovery::{HttpVersionDiscovery, VersionDiscovery};
pub use identity::{fetch_auth_options, new_authenticator, Authenticator, UserPass, UserPassV3};
pub use metrics::ClientMetrics;
pub use negotiator::{ApiVersionNegotiator, Resolution, VersionCache};
pub use tls::TlsClientConfig;
pub use transport::{HttpTransport, Transport, AUTH_TOKEN_HEADER};
