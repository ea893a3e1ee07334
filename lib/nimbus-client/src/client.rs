//! Public and authenticating clients
//!
//! [`PublicClient`] sends requests against a fixed base URL without a token.
//! [`AuthenticatingClient`] wraps one, obtains a token from the identity service,
//! resolves service URLs from the returned catalog and re-authenticates once when
//! a service rejects the token. Both implement [`Client`].
//!
//! The authenticated state lives in one immutable [`Session`] snapshot that an
//! authentication cycle replaces wholesale, so a token is never observable
//! alongside a catalog from a different cycle.

use crate::config::ClientConfig;
use crate::discovery::{HttpVersionDiscovery, VersionDiscovery};
use crate::identity::{fetch_auth_options, identity_root, new_authenticator, Authenticator};
use crate::metrics::ClientMetrics;
use crate::negotiator::{ApiVersionNegotiator, Resolution, VersionCache};
use crate::transport::Transport;
use async_trait::async_trait;
use nimbus_api::{
    AuthMode, AuthOptions, Credentials, Method, RegionServiceUrls, RequestData, ServiceUrls,
};
use nimbus_core::{make_url, ApiVersion, ClientError, Result, ServiceCatalog, VersionError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Sends requests to platform services
#[async_trait]
pub trait Client: Send + Sync {
    /// Send `method` to `api_call` on the endpoint serving `service_type`
    async fn send_request(
        &self,
        method: Method,
        service_type: &str,
        api_version: &str,
        api_call: &str,
        data: &mut RequestData,
    ) -> Result<()>;

    /// Full URL for `parts` on the endpoint serving `service_type`
    async fn make_service_url(
        &self,
        service_type: &str,
        api_version: &str,
        parts: &[&str],
    ) -> Result<String>;
}

/// Client for endpoints that need no authentication
pub struct PublicClient {
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl PublicClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        token: &str,
        data: &mut RequestData,
    ) -> Result<()> {
        self.transport.request(method, url, token, data).await
    }
}

#[async_trait]
impl Client for PublicClient {
    async fn send_request(
        &self,
        method: Method,
        service_type: &str,
        api_version: &str,
        api_call: &str,
        data: &mut RequestData,
    ) -> Result<()> {
        let url = self
            .make_service_url(service_type, api_version, &[api_call])
            .await?;
        self.dispatch(method, &url, "", data).await
    }

    /// Service type and version are ignored; `parts` are joined onto the base URL
    async fn make_service_url(
        &self,
        _service_type: &str,
        _api_version: &str,
        parts: &[&str],
    ) -> Result<String> {
        Ok(make_url(&self.base_url, parts))
    }
}

/// State produced by one authentication cycle
#[derive(Clone, Default)]
struct Session {
    /// Empty until authenticated, and again after invalidation
    token: String,
    tenant_id: String,
    user_id: String,
    /// Every region published by the most recent authentication response, kept
    /// even when the configured region could not be served from it
    regions: Arc<RegionServiceUrls>,
    catalog: ServiceCatalog,
    versions: Arc<VersionCache>,
}

/// Builder for [`AuthenticatingClient`]
pub struct ClientBuilder {
    credentials: Credentials,
    mode: AuthMode,
    transport: Arc<dyn Transport>,
    base_url: String,
    authenticator: Option<Arc<dyn Authenticator>>,
    discovery: Option<Arc<dyn VersionDiscovery>>,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Identity root used for auth option lookups; derived from the credentials when unset
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the authenticator chosen from the auth mode
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Replace HTTP version discovery
    pub fn version_discovery(mut self, discovery: Arc<dyn VersionDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<AuthenticatingClient> {
        self.config.validate()?;
        let mut credentials = self.credentials;
        if credentials.url.ends_with('/') {
            credentials.url.pop();
        }
        credentials.url.push_str(self.mode.token_path());

        let authenticator = self
            .authenticator
            .unwrap_or_else(|| new_authenticator(self.mode, self.transport.clone()));
        let discovery = self
            .discovery
            .unwrap_or_else(|| Arc::new(HttpVersionDiscovery::new(self.transport.clone())));

        Ok(AuthenticatingClient {
            base: PublicClient::new(self.base_url, self.transport),
            credentials,
            mode: self.mode,
            authenticator,
            negotiator: ApiVersionNegotiator::new(discovery),
            required_service_types: RwLock::new(self.config.required_service_types.clone()),
            session: RwLock::new(Arc::new(Session::default())),
            auth_lock: Mutex::new(()),
            auth_options: Mutex::new(None),
            version_discovery: AtomicBool::new(self.config.version_discovery),
            auth_timeout: self.config.auth_timeout(),
            metrics: ClientMetrics::new()?,
        })
    }
}

/// Client that authenticates before sending requests
pub struct AuthenticatingClient {
    base: PublicClient,
    credentials: Credentials,
    mode: AuthMode,
    authenticator: Arc<dyn Authenticator>,
    negotiator: ApiVersionNegotiator,
    required_service_types: RwLock<Vec<String>>,
    session: RwLock<Arc<Session>>,
    /// Serializes authentication cycles
    auth_lock: Mutex<()>,
    auth_options: Mutex<Option<AuthOptions>>,
    version_discovery: AtomicBool,
    auth_timeout: Duration,
    metrics: ClientMetrics,
}

impl AuthenticatingClient {
    pub fn builder(
        credentials: &Credentials,
        mode: AuthMode,
        transport: Arc<dyn Transport>,
    ) -> ClientBuilder {
        ClientBuilder {
            credentials: credentials.clone(),
            mode,
            transport,
            base_url: String::new(),
            authenticator: None,
            discovery: None,
            config: ClientConfig::default(),
        }
    }

    /// Client with the default configuration
    pub fn new(
        credentials: &Credentials,
        mode: AuthMode,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        Self::builder(credentials, mode, transport).build()
    }

    /// Credentials in use, with the token path appended to the identity URL
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.mode
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    fn snapshot(&self) -> Arc<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(&self, session: Session) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(session);
    }

    /// Service types that must be reachable in the configured region
    pub fn required_service_types(&self) -> Vec<String> {
        self.required_service_types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Takes effect on the next authentication
    pub fn set_required_service_types(&self, service_types: Vec<String>) {
        *self
            .required_service_types
            .write()
            .unwrap_or_else(PoisonError::into_inner) = service_types;
    }

    /// Enable or disable API version discovery, returning the previous setting
    ///
    /// With discovery disabled any requested API version is ignored and the
    /// catalog URL is used directly.
    pub fn set_version_discovery_enabled(&self, enabled: bool) -> bool {
        self.version_discovery.swap(enabled, Ordering::SeqCst)
    }

    pub fn is_version_discovery_enabled(&self) -> bool {
        self.version_discovery.load(Ordering::SeqCst)
    }

    /// Current token; empty when not authenticated
    pub fn token(&self) -> String {
        self.snapshot().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.snapshot().token.is_empty()
    }

    pub fn user_id(&self) -> String {
        self.snapshot().user_id.clone()
    }

    pub fn tenant_id(&self) -> String {
        self.snapshot().tenant_id.clone()
    }

    /// Service URLs resolved for the configured region
    pub fn service_urls(&self) -> ServiceUrls {
        self.snapshot().catalog.service_urls().clone()
    }

    /// Service URLs the last authentication published under `region`
    ///
    /// Independent of the configured region, so it also answers after a failed
    /// region lookup.
    pub fn endpoints_for_region(&self, region: &str) -> ServiceUrls {
        self.snapshot()
            .regions
            .get(region)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop the token so the next request authenticates again
    ///
    /// The catalog of the previous session stays readable.
    pub fn invalidate(&self) {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if guard.token.is_empty() {
            return;
        }
        let mut session = Session::clone(&guard);
        session.token.clear();
        *guard = Arc::new(session);
        debug!("Token invalidated");
    }

    /// Authenticate with the identity service, bounded by the configured timeout
    ///
    /// Always performs a full round trip, even when a token is already held.
    pub async fn authenticate(&self) -> Result<()> {
        match tokio::time::timeout(self.auth_timeout, self.do_authenticate()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Authentication response not received in {:?}",
                    self.auth_timeout
                );
                self.metrics.record_authentication("timeout");
                Err(ClientError::Timeout(self.auth_timeout))
            }
        }
    }

    async fn do_authenticate(&self) -> Result<()> {
        let _guard = self.auth_lock.lock().await;

        let details = match self.authenticator.auth(&self.credentials).await {
            Ok(details) => details,
            Err(e) => {
                self.metrics.record_authentication("rejected");
                return Err(ClientError::credential(e));
            }
        };
        debug!("Auth details: {:?}", details);

        let required = self.required_service_types();
        let regions = Arc::new(details.region_service_urls);
        let catalog = match ServiceCatalog::build(
            RegionServiceUrls::clone(&regions),
            &self.credentials.region,
            &required,
        ) {
            Ok(catalog) => catalog,
            Err(e) => {
                // The published regions stay visible for diagnosis; the rest of
                // the previous session is kept as is.
                let mut session = Session::clone(&self.snapshot());
                session.regions = regions;
                self.install(session);
                self.metrics.record_authentication("catalog");
                return Err(ClientError::from(e));
            }
        };

        // The whole session is swapped in at once; the token is only ever seen
        // together with the catalog and version cache built for it.
        self.install(Session {
            token: details.token,
            tenant_id: details.tenant_id,
            user_id: details.user_id,
            regions,
            catalog,
            versions: Arc::new(VersionCache::default()),
        });
        self.metrics.record_authentication("success");
        info!(
            "Authenticated against {} in region {}",
            self.credentials.url, self.credentials.region
        );
        Ok(())
    }

    async fn ensure_authenticated(&self) -> Result<()> {
        if self.is_authenticated() {
            return Ok(());
        }
        self.authenticate().await
    }

    /// URL for `parts` resolved against the catalog and version cache of `session`
    async fn session_url(
        &self,
        session: &Session,
        service_type: &str,
        api_version: &str,
        parts: &[&str],
    ) -> Result<String> {
        if session.token.is_empty() {
            return Err(ClientError::Unauthenticated);
        }
        let service_url = session
            .catalog
            .service_url(service_type)
            .ok_or_else(|| ClientError::UnknownServiceType(service_type.to_string()))?;

        if api_version.is_empty() || !self.is_version_discovery_enabled() {
            return Ok(make_url(service_url, parts));
        }

        let with_service = |source: VersionError| ClientError::ServiceVersion {
            service_type: service_type.to_string(),
            version: api_version.to_string(),
            source,
        };
        let requested: ApiVersion = api_version.parse().map_err(with_service)?;
        let resolution = self
            .negotiator
            .resolve(&session.versions, service_url, requested, &session.token)
            .await
            .map_err(|e| {
                self.metrics.record_version_resolution("error");
                match e {
                    ClientError::Version(source) => with_service(source),
                    other => other,
                }
            })?;

        let url = match resolution {
            Resolution::Versioned(url) => {
                self.metrics.record_version_resolution("versioned");
                make_url(&url, parts)
            }
            Resolution::Unversioned => {
                self.metrics.record_version_resolution("unversioned");
                warn!(
                    "No API versions published for {}, falling back to catalogue service URL",
                    service_url
                );
                make_url(service_url, parts)
            }
        };
        trace!("MakeServiceURL: {}", url);
        Ok(url)
    }

    async fn send_auth_request(
        &self,
        method: Method,
        service_type: &str,
        api_version: &str,
        api_call: &str,
        data: &mut RequestData,
    ) -> Result<()> {
        self.ensure_authenticated().await?;
        // URL and token come from the same session.
        let session = self.snapshot();
        let url = self
            .session_url(&session, service_type, api_version, &[api_call])
            .await?;
        self.base.dispatch(method, &url, &session.token, data).await
    }

    /// Identity API versions offered by the identity service, cached after the
    /// first successful lookup
    pub async fn identity_auth_options(&self) -> Result<AuthOptions> {
        let mut cached = self.auth_options.lock().await;
        if let Some(options) = cached.as_ref().filter(|options| !options.is_empty()) {
            return Ok(options.clone());
        }

        let base_url = if self.base.base_url().is_empty() {
            identity_root(&self.credentials.url)
                .map_err(|e| ClientError::AuthOptions(Box::new(e)))?
        } else {
            self.base.base_url().to_string()
        };

        let options = fetch_auth_options(&base_url, self.base.transport().as_ref())
            .await
            .map_err(|e| ClientError::AuthOptions(Box::new(e)))?;
        *cached = Some(options.clone());
        Ok(options)
    }
}

#[async_trait]
impl Client for AuthenticatingClient {
    /// Authenticates if needed, then sends the request; when the service rejects
    /// the token the whole sequence is repeated exactly once
    async fn send_request(
        &self,
        method: Method,
        service_type: &str,
        api_version: &str,
        api_call: &str,
        data: &mut RequestData,
    ) -> Result<()> {
        self.metrics.record_request(method);
        match self
            .send_auth_request(method, service_type, api_version, api_call, data)
            .await
        {
            Err(e) if e.is_unauthorized() => {
                warn!("Token rejected by {} service, re-authenticating", service_type);
                self.metrics.record_unauthorized_retry();
                self.invalidate();
                self.send_auth_request(method, service_type, api_version, api_call, data)
                    .await
            }
            result => result,
        }
    }

    /// Uses the endpoint matching `api_version` for `service_type`
    ///
    /// Given a major version only, the highest minor is used. An empty
    /// `api_version` (object storage has none) uses the catalog URL as is. Never
    /// authenticates; fails when no token is held.
    async fn make_service_url(
        &self,
        service_type: &str,
        api_version: &str,
        parts: &[&str],
    ) -> Result<String> {
        let session = self.snapshot();
        self.session_url(&session, service_type, api_version, parts)
            .await
    }
}
