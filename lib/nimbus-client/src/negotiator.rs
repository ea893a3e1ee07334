//! API version negotiation for catalog URLs

use crate::discovery::{ServiceRoot, VersionDiscovery};
use nimbus_api::VersionLink;
use nimbus_core::{make_url, select_version, ApiVersion, ClientError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Versions discovered per service URL during one authentication session
#[derive(Debug, Default)]
pub struct VersionCache {
    entries: Mutex<HashMap<String, Arc<Vec<VersionLink>>>>,
}

impl VersionCache {
    pub fn get(&self, service_url: &str) -> Option<Arc<Vec<VersionLink>>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_url)
            .cloned()
    }

    pub fn insert(&self, service_url: &str, versions: Vec<VersionLink>) -> Arc<Vec<VersionLink>> {
        let versions = Arc::new(versions);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(service_url.to_string(), versions.clone());
        versions
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of resolving a catalog URL to a versioned URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The versioned URL to use
    Versioned(String),
    /// The service published no versions; use the catalog URL as is
    Unversioned,
}

/// Resolves requested API versions against discovered versions
pub struct ApiVersionNegotiator {
    discovery: Arc<dyn VersionDiscovery>,
}

impl ApiVersionNegotiator {
    pub fn new(discovery: Arc<dyn VersionDiscovery>) -> Self {
        Self { discovery }
    }

    /// Versions for `service_url`, discovered on first use and cached in `cache`
    pub async fn versions(
        &self,
        cache: &VersionCache,
        service_url: &str,
        token: &str,
    ) -> Result<Arc<Vec<VersionLink>>> {
        if let Some(versions) = cache.get(service_url) {
            return Ok(versions);
        }

        let root = ServiceRoot::parse(service_url)?;
        let versions = match self.discovery.list_versions(&root.root, token).await {
            Ok(versions) => versions,
            // Let the caller re-authenticate on a rejected token.
            Err(e) if e.is_unauthorized() => return Err(e),
            Err(e) => {
                return Err(ClientError::Discovery {
                    url: service_url.to_string(),
                    source: Box::new(e),
                })
            }
        };
        debug!("Caching {} API versions for {}", versions.len(), service_url);
        Ok(cache.insert(service_url, versions))
    }

    /// Resolve `requested` for the catalog URL `service_url`
    ///
    /// Path segments following the version in the catalog URL (a tenant id, for
    /// example) are carried over onto the selected versioned URL.
    pub async fn resolve(
        &self,
        cache: &VersionCache,
        service_url: &str,
        requested: ApiVersion,
        token: &str,
    ) -> Result<Resolution> {
        let versions = self.versions(cache, service_url, token).await?;
        if versions.is_empty() {
            return Ok(Resolution::Unversioned);
        }

        let selected = select_version(&versions, requested, service_url)?;
        let root = ServiceRoot::parse(service_url)?;
        let suffix: Vec<&str> = root.suffix.iter().map(String::as_str).collect();
        let url = make_url(&selected.url, &suffix);
        debug!("Resolved {} {} to {}", service_url, requested, url);
        Ok(Resolution::Versioned(url))
    }
}
