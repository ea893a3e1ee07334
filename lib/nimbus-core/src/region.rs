//! Hierarchical region matching
//!
//! Regions are dot-delimited and addressed most-specific-first, so a user region
//! "az-1.region-a.geo-1" is served by endpoints published under "region-a.geo-1".

use nimbus_api::RegionServiceUrls;
use std::collections::{BTreeSet, HashMap};

/// Whether endpoints published under `endpoint_region` serve `user_region`
///
/// Plain suffix comparison: "xregion-a" matches "region-a".
pub fn region_matches(user_region: &str, endpoint_region: &str) -> bool {
    user_region.ends_with(endpoint_region)
}

/// Service types the caller requires but cannot reach, and the regions that could
/// reach all of them at once
///
/// Returned regions are deduplicated and sorted. They are only ever used in
/// diagnostics.
pub fn suggest_regions(
    required: &[String],
    accessible: &[String],
    catalog: &RegionServiceUrls,
) -> (Vec<String>, Vec<String>) {
    let missing: Vec<String> = required
        .iter()
        .filter(|service_type| !accessible.contains(service_type))
        .cloned()
        .collect();

    if missing.is_empty() {
        return (missing, Vec::new());
    }

    let service_type_regions = service_type_regions(catalog);
    let empty = Vec::new();
    let regions_for = |service_type: &str| -> &Vec<String> {
        service_type_regions.get(service_type).unwrap_or(&empty)
    };

    let mut candidates = BTreeSet::new();
    if missing.len() == 1 {
        candidates.extend(regions_for(&missing[0]).iter().cloned());
    } else {
        for service_type in &missing {
            for other in &missing {
                if service_type == other {
                    continue;
                }
                let other_regions = regions_for(other);
                for region in regions_for(service_type) {
                    if !has_more_specific(other_regions, region)
                        && has_super_region(other_regions, region)
                    {
                        candidates.insert(region.clone());
                    }
                }
            }
        }
    }

    (missing, candidates.into_iter().collect())
}

/// Service type to every region advertising it
fn service_type_regions(catalog: &RegionServiceUrls) -> HashMap<&str, Vec<String>> {
    let mut map: HashMap<&str, Vec<String>> = HashMap::new();
    for (region, urls) in catalog {
        for service_type in urls.keys() {
            let regions = map.entry(service_type.as_str()).or_default();
            if !regions.contains(region) {
                regions.push(region.clone());
            }
        }
    }
    map
}

/// Some region in `regions` is strictly more specific than `region`
fn has_more_specific(regions: &[String], region: &str) -> bool {
    regions
        .iter()
        .any(|candidate| region_matches(candidate, region) && candidate != region)
}

/// `region` lies within (or equals) some region in `regions`
fn has_super_region(regions: &[String], region: &str) -> bool {
    regions
        .iter()
        .any(|candidate| region_matches(region, candidate) || candidate == region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_api::ServiceUrls;

    fn catalog(entries: &[(&str, &[&str])]) -> RegionServiceUrls {
        entries
            .iter()
            .map(|(region, types)| {
                let urls: ServiceUrls = types
                    .iter()
                    .map(|t| (t.to_string(), format!("http://{}.{}", t, region)))
                    .collect();
                (region.to_string(), urls)
            })
            .collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_region_matches_exact_and_suffix() {
        assert!(region_matches("region-a", "region-a"));
        assert!(region_matches("az-1.region-a.geo-1", "region-a.geo-1"));
        assert!(region_matches("az-1.region-a.geo-1", "geo-1"));
        assert!(!region_matches("region-a.geo-1", "az-1.region-a.geo-1"));
        assert!(!region_matches("region-b", "region-a"));
    }

    // Documented behaviour: no dot-boundary check is made.
    #[test]
    fn test_region_matches_without_boundary_check() {
        assert!(region_matches("xregion-a", "region-a"));
        assert!(region_matches("anything", ""));
    }

    #[test]
    fn test_region_matches_is_suffix_test() {
        let regions = ["", "a", "b.a", "c.b.a", "xb.a", "region-a", "a.region-a"];
        for user in regions {
            for endpoint in regions {
                assert_eq!(
                    region_matches(user, endpoint),
                    user.ends_with(endpoint),
                    "{} / {}",
                    user,
                    endpoint
                );
            }
        }
    }

    #[test]
    fn test_suggest_nothing_missing() {
        let catalog = catalog(&[("region-a", &["compute"])]);
        let (missing, suggested) =
            suggest_regions(&strings(&["compute"]), &strings(&["compute"]), &catalog);
        assert!(missing.is_empty());
        assert!(suggested.is_empty());
    }

    #[test]
    fn test_suggest_single_missing_type() {
        let catalog = catalog(&[
            ("region-a", &["compute"]),
            ("region-c", &["object-store"]),
            ("region-b", &["object-store", "compute"]),
        ]);
        let (missing, suggested) = suggest_regions(
            &strings(&["compute", "object-store"]),
            &strings(&["compute"]),
            &catalog,
        );
        assert_eq!(missing, strings(&["object-store"]));
        assert_eq!(suggested, strings(&["region-b", "region-c"]));
    }

    #[test]
    fn test_suggest_most_specific_regions_for_several_missing_types() {
        let catalog = catalog(&[
            ("az-1.region-a", &["compute"]),
            ("az-2.region-a", &["compute"]),
            ("region-a", &["object-store"]),
            ("region-b", &["identity"]),
        ]);
        let (missing, suggested) = suggest_regions(
            &strings(&["compute", "object-store"]),
            &[],
            &catalog,
        );
        assert_eq!(missing, strings(&["compute", "object-store"]));
        assert_eq!(suggested, strings(&["az-1.region-a", "az-2.region-a"]));
    }

    #[test]
    fn test_suggest_shared_region_listed_once() {
        let catalog = catalog(&[
            ("region-a", &["compute", "object-store"]),
            ("region-b", &["compute"]),
        ]);
        let (_, suggested) = suggest_regions(
            &strings(&["compute", "object-store"]),
            &[],
            &catalog,
        );
        assert_eq!(suggested, strings(&["region-a"]));
    }

    #[test]
    fn test_suggest_no_region_reaches_everything() {
        let catalog = catalog(&[("region-a", &["compute"]), ("region-b", &["object-store"])]);
        let (missing, suggested) = suggest_regions(
            &strings(&["compute", "object-store"]),
            &[],
            &catalog,
        );
        assert_eq!(missing.len(), 2);
        assert!(suggested.is_empty());
    }

    #[test]
    fn test_suggest_unknown_service_type() {
        let catalog = catalog(&[("region-a", &["compute"])]);
        let (missing, suggested) = suggest_regions(&strings(&["dns"]), &[], &catalog);
        assert_eq!(missing, strings(&["dns"]));
        assert!(suggested.is_empty());
    }
}
