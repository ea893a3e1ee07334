//! Identity service authentication
//!
//! Password authentication against identity API v2 (`POST .../tokens`) and v3
//! (`POST .../auth/tokens`), plus discovery of the identity API versions a
//! deployment offers.

use crate::discovery::VersionsDocument;
use crate::transport::Transport;
use async_trait::async_trait;
use nimbus_api::{
    AuthDetails, AuthMode, AuthOption, AuthOptions, Credentials, Method, RegionServiceUrls,
    RequestData,
};
use nimbus_core::{ApiVersion, ClientError, Result};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Header carrying the issued token in identity v3 responses
const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

/// Exchanges stored credentials for a token and a service catalog
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn auth(&self, credentials: &Credentials) -> Result<AuthDetails>;
}

/// Create the authenticator for `mode`
pub fn new_authenticator(mode: AuthMode, transport: Arc<dyn Transport>) -> Arc<dyn Authenticator> {
    match mode {
        AuthMode::UserPass => Arc::new(UserPass::new(transport)),
        AuthMode::UserPassV3 => Arc::new(UserPassV3::new(transport)),
    }
}

/// Identity v2 password authentication
pub struct UserPass {
    transport: Arc<dyn Transport>,
}

impl UserPass {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[derive(Debug, Deserialize)]
struct V2Response {
    access: V2Access,
}

#[derive(Debug, Deserialize)]
struct V2Access {
    token: V2Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<V2Service>,
    user: V2Id,
}

#[derive(Debug, Deserialize)]
struct V2Token {
    id: String,
    #[serde(default)]
    tenant: Option<V2Id>,
}

#[derive(Debug, Deserialize)]
struct V2Id {
    id: String,
}

#[derive(Debug, Deserialize)]
struct V2Service {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<V2Endpoint>,
}

#[derive(Debug, Deserialize)]
struct V2Endpoint {
    #[serde(default)]
    region: String,
    #[serde(rename = "publicURL")]
    public_url: String,
}

#[async_trait]
impl Authenticator for UserPass {
    async fn auth(&self, credentials: &Credentials) -> Result<AuthDetails> {
        let mut auth = json!({
            "passwordCredentials": {
                "username": credentials.user,
                "password": credentials.secrets,
            }
        });
        if !credentials.tenant_name.is_empty() {
            auth["tenantName"] = json!(credentials.tenant_name);
        }

        let mut data = RequestData::json(&json!({ "auth": auth }))?.with_expected_status(&[200]);
        self.transport
            .request(Method::Post, &credentials.url, "", &mut data)
            .await?;

        let response: V2Response = data.resp_json()?;
        let access = response.access;

        let mut region_service_urls = RegionServiceUrls::new();
        for service in access.service_catalog {
            for endpoint in service.endpoints {
                region_service_urls
                    .entry(endpoint.region)
                    .or_default()
                    .insert(service.service_type.clone(), endpoint.public_url);
            }
        }

        debug!(
            "Identity v2 issued a token for user {} across {} regions",
            access.user.id,
            region_service_urls.len()
        );

        Ok(AuthDetails {
            token: access.token.id,
            tenant_id: access.token.tenant.map(|t| t.id).unwrap_or_default(),
            user_id: access.user.id,
            region_service_urls,
        })
    }
}

/// Identity v3 password authentication
pub struct UserPassV3 {
    transport: Arc<dyn Transport>,
}

impl UserPassV3 {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[derive(Debug, Deserialize)]
struct V3Response {
    token: V3Token,
}

#[derive(Debug, Deserialize)]
struct V3Token {
    #[serde(default)]
    catalog: Vec<V3Service>,
    user: V3Id,
    #[serde(default)]
    project: Option<V3Id>,
}

#[derive(Debug, Deserialize)]
struct V3Id {
    id: String,
}

#[derive(Debug, Deserialize)]
struct V3Service {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<V3Endpoint>,
}

#[derive(Debug, Deserialize)]
struct V3Endpoint {
    interface: String,
    #[serde(default)]
    region: String,
    url: String,
}

#[async_trait]
impl Authenticator for UserPassV3 {
    async fn auth(&self, credentials: &Credentials) -> Result<AuthDetails> {
        let domain = json!({ "name": credentials.domain_or_default() });
        let mut auth = json!({
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": credentials.user,
                        "password": credentials.secrets,
                        "domain": domain,
                    }
                }
            }
        });
        if !credentials.tenant_name.is_empty() {
            auth["scope"] = json!({
                "project": {
                    "name": credentials.tenant_name,
                    "domain": domain,
                }
            });
        }

        let mut data = RequestData::json(&json!({ "auth": auth }))?.with_expected_status(&[201]);
        self.transport
            .request(Method::Post, &credentials.url, "", &mut data)
            .await?;

        let token = data
            .resp_header(SUBJECT_TOKEN_HEADER)
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::Internal("identity response carried no subject token".to_string())
            })?;
        let response: V3Response = data.resp_json()?;
        let body = response.token;

        let mut region_service_urls = RegionServiceUrls::new();
        for service in body.catalog {
            for endpoint in service.endpoints {
                if endpoint.interface != "public" {
                    continue;
                }
                region_service_urls
                    .entry(endpoint.region)
                    .or_default()
                    .insert(service.service_type.clone(), endpoint.url);
            }
        }

        debug!(
            "Identity v3 issued a token for user {} across {} regions",
            body.user.id,
            region_service_urls.len()
        );

        Ok(AuthDetails {
            token,
            tenant_id: body.project.map(|p| p.id).unwrap_or_default(),
            user_id: body.user.id,
            region_service_urls,
        })
    }
}

/// Root of the identity service that serves `identity_url`
pub fn identity_root(identity_url: &str) -> Result<String> {
    let url = Url::parse(identity_url).map_err(|e| ClientError::InvalidUrl {
        url: identity_url.to_string(),
        message: e.to_string(),
    })?;
    let root = url.join("/").map_err(|e| ClientError::InvalidUrl {
        url: identity_url.to_string(),
        message: e.to_string(),
    })?;
    Ok(root.to_string())
}

/// Identity API versions offered at `base_url`, mapped to auth modes
///
/// Versions without a supported auth mode are left out.
pub async fn fetch_auth_options(base_url: &str, transport: &dyn Transport) -> Result<AuthOptions> {
    let mut data = RequestData::new()
        .expect_json()
        .with_expected_status(&[200, 300]);
    transport
        .request(Method::Get, base_url, "", &mut data)
        .await?;

    let document: VersionsDocument = data.resp_json()?;
    let base = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
        url: base_url.to_string(),
        message: e.to_string(),
    })?;

    let mut options = AuthOptions::new();
    for entry in document.versions.into_entries() {
        let mode = match ApiVersion::from_path_segment(&entry.id).map(|v| v.major) {
            Some(2) => AuthMode::UserPass,
            Some(3) => AuthMode::UserPassV3,
            _ => continue,
        };
        if let Some(endpoint) = entry.self_url(&base) {
            options.push(AuthOption { mode, endpoint });
        }
    }
    debug!("Identity service at {} offers {} auth options", base_url, options.len());
    Ok(options)
}
