//! Service catalog for the configured region

use crate::error::CatalogError;
use crate::region::{region_matches, suggest_regions};
use nimbus_api::{RegionServiceUrls, ServiceUrls};
use tracing::debug;

/// The catalog returned by one authentication, filtered down to the configured region
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceCatalog {
    region: String,
    regions: RegionServiceUrls,
    service_urls: ServiceUrls,
}

impl ServiceCatalog {
    /// Derive the service URLs reachable from `region`
    ///
    /// Entries from every region matching `region` are merged, least specific
    /// first, so the most specific matching region wins on a service type
    /// collision. Fails when nothing matches or when a `required` service type is
    /// absent from the merged map.
    pub fn build(
        regions: RegionServiceUrls,
        region: &str,
        required: &[String],
    ) -> Result<Self, CatalogError> {
        let mut matching: Vec<&String> = regions
            .keys()
            .filter(|endpoint_region| region_matches(region, endpoint_region))
            .collect();

        if matching.is_empty() {
            let (missing, suggested) = suggest_regions(required, &[], &regions);
            return Err(CatalogError::InvalidRegion {
                region: region.to_string(),
                missing,
                suggested,
            });
        }

        matching.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        let mut service_urls = ServiceUrls::new();
        for endpoint_region in &matching {
            if let Some(urls) = regions.get(*endpoint_region) {
                for (service_type, url) in urls {
                    service_urls.insert(service_type.clone(), url.clone());
                }
            }
        }

        let accessible: Vec<String> = required
            .iter()
            .filter(|service_type| service_urls.contains_key(*service_type))
            .cloned()
            .collect();
        let (missing, suggested) = suggest_regions(required, &accessible, &regions);
        if !missing.is_empty() {
            return Err(CatalogError::MissingServices {
                region: region.to_string(),
                required: required.to_vec(),
                missing,
                suggested,
            });
        }

        debug!(
            "Region {} resolved to {} service URLs from {} catalog regions",
            region,
            service_urls.len(),
            matching.len()
        );

        Ok(Self {
            region: region.to_string(),
            regions,
            service_urls,
        })
    }

    /// The configured region this catalog was filtered for
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Base URL for a service type in the configured region
    pub fn service_url(&self, service_type: &str) -> Option<&str> {
        self.service_urls.get(service_type).map(|url| url.as_str())
    }

    pub fn service_urls(&self) -> &ServiceUrls {
        &self.service_urls
    }

    /// Full unfiltered catalog
    pub fn regions(&self) -> &RegionServiceUrls {
        &self.regions
    }

    /// Service URLs published under exactly `region`, regardless of the configured one
    pub fn endpoints_for_region(&self, region: &str) -> ServiceUrls {
        self.regions.get(region).cloned().unwrap_or_default()
    }
}

/// Join `parts` onto `base`, adding a separating slash only when needed
pub fn make_url(base: &str, parts: &[&str]) -> String {
    let mut url = base.to_string();
    if !url.ends_with('/') && !parts.is_empty() {
        url.push('/');
    }
    url.push_str(&parts.join("/"));
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_urls(entries: &[(&str, &[(&str, &str)])]) -> RegionServiceUrls {
        entries
            .iter()
            .map(|(region, urls)| {
                (
                    region.to_string(),
                    urls.iter()
                        .map(|(t, u)| (t.to_string(), u.to_string()))
                        .collect(),
                )
            })
            .collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn sample() -> RegionServiceUrls {
        region_urls(&[
            (
                "region-a",
                &[("compute", "http://compute.a"), ("object-store", "http://swift.a")],
            ),
            ("region-b", &[("compute", "http://compute.b")]),
            ("az-1.region-c", &[("compute", "http://compute.c1")]),
            ("region-c", &[("object-store", "http://swift.c")]),
        ])
    }

    #[test]
    fn test_build_exact_region() {
        let catalog =
            ServiceCatalog::build(sample(), "region-a", &strings(&["compute", "object-store"]))
                .unwrap();
        assert_eq!(catalog.service_url("compute"), Some("http://compute.a"));
        assert_eq!(catalog.service_url("object-store"), Some("http://swift.a"));
        assert_eq!(catalog.region(), "region-a");
    }

    #[test]
    fn test_build_merges_hierarchical_regions() {
        let catalog = ServiceCatalog::build(
            sample(),
            "az-1.region-c",
            &strings(&["compute", "object-store"]),
        )
        .unwrap();
        assert_eq!(catalog.service_url("compute"), Some("http://compute.c1"));
        assert_eq!(catalog.service_url("object-store"), Some("http://swift.c"));
    }

    #[test]
    fn test_build_most_specific_region_wins_collision() {
        let regions = region_urls(&[
            ("geo-1", &[("compute", "http://compute.geo")]),
            ("region-a.geo-1", &[("compute", "http://compute.region")]),
            ("az-1.region-a.geo-1", &[("compute", "http://compute.az")]),
        ]);
        for _ in 0..10 {
            let catalog = ServiceCatalog::build(
                regions.clone(),
                "az-1.region-a.geo-1",
                &strings(&["compute"]),
            )
            .unwrap();
            assert_eq!(catalog.service_url("compute"), Some("http://compute.az"));
        }
    }

    #[test]
    fn test_build_invalid_region_lists_independent_suggestions() {
        let required = strings(&["compute", "object-store"]);
        let regions = sample();
        let (_, expected) = suggest_regions(&required, &[], &regions);

        let err = ServiceCatalog::build(regions, "region-z", &required).unwrap_err();
        match &err {
            CatalogError::InvalidRegion {
                region, suggested, ..
            } => {
                assert_eq!(region, "region-z");
                assert_eq!(suggested, &expected);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().starts_with("invalid region \"region-z\""));
    }

    #[test]
    fn test_build_missing_service_names_missing_set() {
        let err = ServiceCatalog::build(
            sample(),
            "region-b",
            &strings(&["compute", "object-store"]),
        )
        .unwrap_err();
        assert_eq!(err.missing(), &strings(&["object-store"])[..]);
        assert_eq!(err.suggested(), &strings(&["region-a", "region-c"])[..]);
        let message = err.to_string();
        assert!(message.contains("the configured region \"region-b\""));
        assert!(message.contains("namely: compute, object-store"));
        assert!(message.contains("access to these services is missing: object-store"));
        assert!(message.contains("one of these regions may be suitable instead: region-a, region-c"));
    }

    #[test]
    fn test_build_optional_service_may_be_absent() {
        let catalog =
            ServiceCatalog::build(sample(), "region-b", &strings(&["compute"])).unwrap();
        assert_eq!(catalog.service_url("object-store"), None);
    }

    #[test]
    fn test_build_without_matching_region_fails_even_with_no_requirements() {
        let err = ServiceCatalog::build(sample(), "region-z", &[]).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRegion { .. }));
    }

    #[test]
    fn test_endpoints_for_region() {
        let catalog =
            ServiceCatalog::build(sample(), "region-b", &strings(&["compute"])).unwrap();
        let urls = catalog.endpoints_for_region("region-a");
        assert_eq!(urls.get("object-store").map(String::as_str), Some("http://swift.a"));
        assert!(catalog.endpoints_for_region("region-q").is_empty());
    }

    #[test]
    fn test_make_url() {
        assert_eq!(make_url("http://host", &[]), "http://host");
        assert_eq!(make_url("http://host", &["servers"]), "http://host/servers");
        assert_eq!(make_url("http://host/", &["servers"]), "http://host/servers");
        assert_eq!(
            make_url("http://host/v2", &["servers", "detail"]),
            "http://host/v2/servers/detail"
        );
    }
}
