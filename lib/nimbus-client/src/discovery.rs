//! API version discovery against service roots

use crate::transport::Transport;
use async_trait::async_trait;
use nimbus_api::{Method, RequestData, VersionLink};
use nimbus_core::{ApiVersion, ClientError, Result};
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Lists the API versions published at a service root
#[async_trait]
pub trait VersionDiscovery: Send + Sync {
    async fn list_versions(&self, root_url: &str, token: &str) -> Result<Vec<VersionLink>>;
}

/// A catalog URL split around its version segment
///
/// "http://compute:8774/v2/abc123" has the root "http://compute:8774/" and the
/// suffix `["abc123"]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRoot {
    pub root: String,
    pub suffix: Vec<String>,
}

impl ServiceRoot {
    pub fn parse(service_url: &str) -> Result<Self> {
        let mut url = Url::parse(service_url).map_err(|e| ClientError::InvalidUrl {
            url: service_url.to_string(),
            message: e.to_string(),
        })?;

        let segments: Vec<String> = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let (prefix, suffix) = match segments
            .iter()
            .position(|s| ApiVersion::from_path_segment(s).is_some())
        {
            Some(index) => (&segments[..index], segments[index + 1..].to_vec()),
            None => (&segments[..], Vec::new()),
        };

        let mut path = String::from("/");
        for segment in prefix {
            path.push_str(segment);
            path.push('/');
        }
        url.set_path(&path);
        url.set_query(None);

        Ok(Self {
            root: url.to_string(),
            suffix,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionsDocument {
    pub versions: VersionList,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum VersionList {
    Values { values: Vec<VersionEntry> },
    List(Vec<VersionEntry>),
}

impl VersionList {
    pub fn into_entries(self) -> Vec<VersionEntry> {
        match self {
            VersionList::Values { values } => values,
            VersionList::List(entries) => entries,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionEntry {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub links: Vec<VersionLinkEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionLinkEntry {
    pub href: String,
    #[serde(default)]
    pub rel: String,
}

impl VersionEntry {
    /// The "self" link, resolved against `base`
    pub fn self_url(&self, base: &Url) -> Option<String> {
        let link = self.links.iter().find(|link| link.rel == "self")?;
        base.join(&link.href).ok().map(|url| url.to_string())
    }
}

/// Parse a versions document published at `root_url`
pub(crate) fn parse_versions(root_url: &str, document: VersionsDocument) -> Result<Vec<VersionLink>> {
    let base = Url::parse(root_url).map_err(|e| ClientError::InvalidUrl {
        url: root_url.to_string(),
        message: e.to_string(),
    })?;

    let mut versions = Vec::new();
    for entry in document.versions.into_entries() {
        let Some(version) = ApiVersion::from_path_segment(&entry.id) else {
            debug!("Skipping unparsable version id {:?}", entry.id);
            continue;
        };
        let Some(url) = entry.self_url(&base) else {
            debug!("Skipping version {} without a self link", entry.id);
            continue;
        };
        debug!("Found version {} ({}) at {}", entry.id, entry.status, url);
        versions.push(VersionLink::new(
            version.major,
            version.minor.unwrap_or(0),
            url,
        ));
    }
    Ok(versions)
}

/// Version discovery over HTTP
pub struct HttpVersionDiscovery {
    transport: Arc<dyn Transport>,
}

impl HttpVersionDiscovery {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl VersionDiscovery for HttpVersionDiscovery {
    async fn list_versions(&self, root_url: &str, token: &str) -> Result<Vec<VersionLink>> {
        // Roots commonly answer 300 Multiple Choices.
        let mut data = RequestData::new()
            .expect_json()
            .with_expected_status(&[200, 300]);
        self.transport
            .request(Method::Get, root_url, token, &mut data)
            .await?;

        let document: VersionsDocument = data.resp_json()?;
        let versions = parse_versions(root_url, document)?;
        debug!("Discovered {} API versions at {}", versions.len(), root_url);
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_root_strips_version_and_keeps_suffix() {
        let root = ServiceRoot::parse("http://compute:8774/v2/abc123").unwrap();
        assert_eq!(root.root, "http://compute:8774/");
        assert_eq!(root.suffix, vec!["abc123"]);
    }

    #[test]
    fn test_service_root_with_prefix_path() {
        let root = ServiceRoot::parse("https://cloud.example.com/volume/v3.1/").unwrap();
        assert_eq!(root.root, "https://cloud.example.com/volume/");
        assert!(root.suffix.is_empty());
    }

    #[test]
    fn test_service_root_without_version() {
        let root = ServiceRoot::parse("http://network:9696").unwrap();
        assert_eq!(root.root, "http://network:9696/");
        assert!(root.suffix.is_empty());
    }

    #[test]
    fn test_service_root_ignores_numeric_segments() {
        let root = ServiceRoot::parse("http://storage/12345/v1/AUTH_x").unwrap();
        assert_eq!(root.root, "http://storage/12345/");
        assert_eq!(root.suffix, vec!["AUTH_x"]);
    }

    #[test]
    fn test_service_root_invalid_url() {
        assert!(matches!(
            ServiceRoot::parse("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_parse_versions_list_form() {
        let document: VersionsDocument = serde_json::from_value(json!({
            "versions": [
                {"id": "v2.0", "status": "SUPPORTED",
                 "links": [{"href": "http://compute/v2/", "rel": "self"}]},
                {"id": "v2.1", "status": "CURRENT",
                 "links": [{"href": "http://compute/v2.1/", "rel": "self"}]}
            ]
        }))
        .unwrap();
        let versions = parse_versions("http://compute/", document).unwrap();
        assert_eq!(
            versions,
            vec![
                VersionLink::new(2, 0, "http://compute/v2/"),
                VersionLink::new(2, 1, "http://compute/v2.1/"),
            ]
        );
    }

    #[test]
    fn test_parse_versions_values_form_with_relative_links() {
        let document: VersionsDocument = serde_json::from_value(json!({
            "versions": {"values": [
                {"id": "v3.14", "status": "stable",
                 "links": [{"href": "v3/", "rel": "self"}, {"href": "http://docs", "rel": "describedby"}]},
                {"id": "latest", "links": [{"href": "latest/", "rel": "self"}]},
                {"id": "v1.0", "links": []}
            ]}
        }))
        .unwrap();
        let versions = parse_versions("http://identity:5000/", document).unwrap();
        assert_eq!(versions, vec![VersionLink::new(3, 14, "http://identity:5000/v3/")]);
    }
}
