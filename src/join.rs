//! Joining aggregate keys against the region catalog.
//!
//! Map geometry is keyed by region display name, so the join is a name join.
//! Names are compared after normalization only: trimmed, inner whitespace runs
//! collapsed to a single space, lowercased. There is no fuzzy matching. A key
//! that does not normalize to a catalog name is reported as a miss and the
//! rest of the refresh carries on.
//!
//! The catalog is indexed once per refresh so each lookup is a hash probe.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::aggregate::RegionIdentity;
use crate::Region;

/// Normalize a region name for joining.
///
/// # Example
/// ```
/// use flight_regions::normalize_name;
///
/// assert_eq!(normalize_name("  Moscow   Oblast "), "moscow oblast");
/// assert_eq!(normalize_name("МОСКВА"), "москва");
/// ```
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Why an entry could not take part in the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinFailure {
    /// Aggregate key has no catalog region with that normalized name (or id)
    NotFound,
    /// Catalog region shares its normalized name with an earlier region
    DuplicateCatalogName,
    /// Catalog region has an empty name
    BlankCatalogName,
    /// Catalog region shares its id with an earlier region; still joined by name
    DuplicateCatalogId,
}

/// A non-fatal join problem, surfaced to the host as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDiagnostic {
    /// Normalized region name (or `#id` for id keys); the catalog name as
    /// written for catalog-side problems
    pub key: String,
    /// Catalog region id, for catalog-side problems
    pub region_id: Option<i64>,
    pub reason: JoinFailure,
    /// Flights that could not be attributed because of this problem
    pub flight_count: u32,
}

impl JoinDiagnostic {
    fn catalog(region: &Region, reason: JoinFailure) -> Self {
        Self {
            key: region.name.clone(),
            region_id: Some(region.region_id),
            reason,
            flight_count: 0,
        }
    }

    fn not_found(identity: &RegionIdentity, flight_count: u32) -> Self {
        Self {
            key: identity.to_string(),
            region_id: None,
            reason: JoinFailure::NotFound,
            flight_count,
        }
    }
}

/// Catalog indexed by normalized name and by id.
///
/// Only regions that can be joined unambiguously are indexed; the others are
/// recorded in [`RegionIndex::catalog_diagnostics`].
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    /// Indexed regions in catalog order
    regions: Vec<Region>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<i64, usize>,
    catalog_diagnostics: Vec<JoinDiagnostic>,
}

/// Counts joined onto the indexed catalog.
#[derive(Debug, Clone, Default)]
pub struct JoinResult {
    /// Count per indexed region, parallel to [`RegionIndex::regions`]
    pub counts: Vec<u32>,
    /// Aggregate keys that matched nothing, sorted by key
    pub misses: Vec<JoinDiagnostic>,
}

impl RegionIndex {
    /// Index a catalog snapshot.
    pub fn build(catalog: &[Region]) -> Self {
        let mut index = Self {
            regions: Vec::with_capacity(catalog.len()),
            by_name: HashMap::with_capacity(catalog.len()),
            by_id: HashMap::with_capacity(catalog.len()),
            catalog_diagnostics: Vec::new(),
        };

        for region in catalog {
            let key = normalize_name(&region.name);
            if key.is_empty() {
                warn!("[Join] Region {} has a blank name", region.region_id);
                index
                    .catalog_diagnostics
                    .push(JoinDiagnostic::catalog(region, JoinFailure::BlankCatalogName));
                continue;
            }
            if index.by_name.contains_key(&key) {
                warn!(
                    "[Join] Region {} duplicates name '{}', ignoring it",
                    region.region_id, region.name
                );
                index
                    .catalog_diagnostics
                    .push(JoinDiagnostic::catalog(region, JoinFailure::DuplicateCatalogName));
                continue;
            }

            let position = index.regions.len();
            index.by_name.insert(key, position);
            if index.by_id.contains_key(&region.region_id) {
                warn!(
                    "[Join] Region '{}' duplicates id {}, not indexing it by id",
                    region.name, region.region_id
                );
                index
                    .catalog_diagnostics
                    .push(JoinDiagnostic::catalog(region, JoinFailure::DuplicateCatalogId));
            } else {
                index.by_id.insert(region.region_id, position);
            }
            index.regions.push(region.clone());
        }

        debug!(
            "[Join] Indexed {} of {} catalog regions",
            index.regions.len(),
            catalog.len()
        );
        index
    }

    /// Indexed regions in catalog order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Problems found while indexing the catalog itself.
    pub fn catalog_diagnostics(&self) -> &[JoinDiagnostic] {
        &self.catalog_diagnostics
    }

    /// Resolve a region name. `None` means not found; nothing is guessed.
    pub fn resolve_name(&self, name: &str) -> Option<&Region> {
        self.position_by_name(name).map(|i| &self.regions[i])
    }

    pub fn resolve_id(&self, region_id: i64) -> Option<&Region> {
        self.by_id.get(&region_id).map(|&i| &self.regions[i])
    }

    /// Resolve an aggregate identity, whichever keying produced it.
    pub fn resolve(&self, identity: &RegionIdentity) -> Option<&Region> {
        self.position(identity).map(|i| &self.regions[i])
    }

    fn position_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(&normalize_name(name)).copied()
    }

    /// Position of the matching region within [`RegionIndex::regions`].
    pub fn position(&self, identity: &RegionIdentity) -> Option<usize> {
        match identity {
            RegionIdentity::Name(name) => self.position_by_name(name),
            RegionIdentity::Id(id) => self.by_id.get(id).copied(),
        }
    }

    /// Join per-identity counts onto the indexed regions.
    ///
    /// Keys that collapse onto the same region are summed.
    pub fn join_counts(&self, counts: &HashMap<RegionIdentity, u32>) -> JoinResult {
        let mut joined = vec![0u32; self.regions.len()];
        let mut misses = Vec::new();

        for (identity, &count) in counts {
            match self.position(identity) {
                Some(i) => joined[i] += count,
                None => misses.push(JoinDiagnostic::not_found(identity, count)),
            }
        }

        misses.sort_by(|a, b| a.key.cmp(&b.key));
        for miss in &misses {
            warn!(
                "[Join] No catalog region for '{}' ({} flights)",
                miss.key, miss.flight_count
            );
        }

        JoinResult {
            counts: joined,
            misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeometryRef;

    fn region(id: i64, name: &str) -> Region {
        Region::new(id, name, 100.0, GeometryRef::new(format!("geo-{}", id)))
    }

    fn catalog() -> Vec<Region> {
        vec![
            region(1, "Central"),
            region(2, "Northern"),
            region(3, "Южный"),
        ]
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Central"), "central");
        assert_eq!(normalize_name("\tNew \u{a0} York\n"), "new york");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_resolve_is_case_and_whitespace_insensitive() {
        let index = RegionIndex::build(&catalog());
        assert_eq!(index.resolve_name("  NORTHERN ").unwrap().region_id, 2);
        assert_eq!(index.resolve_name("южный").unwrap().region_id, 3);
        assert_eq!(index.resolve_id(1).unwrap().name, "Central");
    }

    #[test]
    fn test_no_fuzzy_matching() {
        let index = RegionIndex::build(&catalog());
        assert!(index.resolve_name("Nothern").is_none());
        assert!(index.resolve_name("Centra").is_none());
        // Latin "y" in place of Cyrillic "ы" is a different name
        assert!(index.resolve_name("Южнyй").is_none());
    }

    #[test]
    fn test_catalog_problems_are_diagnosed() {
        let mut regions = catalog();
        regions.push(region(4, " central "));
        regions.push(region(5, "  "));
        let index = RegionIndex::build(&regions);

        assert_eq!(index.len(), 3);
        let reasons: Vec<JoinFailure> = index
            .catalog_diagnostics()
            .iter()
            .map(|d| d.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![JoinFailure::DuplicateCatalogName, JoinFailure::BlankCatalogName]
        );
        // first region with the name wins
        assert_eq!(index.resolve_name("central").unwrap().region_id, 1);
        assert!(index.resolve_id(4).is_none());
    }

    #[test]
    fn test_join_counts_contains_misses() {
        let index = RegionIndex::build(&catalog());
        let mut counts = HashMap::new();
        counts.insert(RegionIdentity::Name("central".to_string()), 4);
        counts.insert(RegionIdentity::Name("atlantis".to_string()), 2);
        counts.insert(RegionIdentity::Id(3), 1);

        let result = index.join_counts(&counts);
        assert_eq!(result.counts, vec![4, 0, 1]);
        assert_eq!(result.misses.len(), 1);
        assert_eq!(result.misses[0].key, "atlantis");
        assert_eq!(result.misses[0].reason, JoinFailure::NotFound);
        assert_eq!(result.misses[0].flight_count, 2);
    }

    #[test]
    fn test_miss_key_is_normalized_name() {
        let index = RegionIndex::build(&catalog());
        let flights = vec![crate::FlightRecord::between(
            1,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            (9, "  Far   EAST "),
            (9, "Far East"),
        )];
        let counts = crate::aggregate_flights(&flights, crate::RegionKeying::Name);

        let result = index.join_counts(&counts);
        assert_eq!(result.misses.len(), 1);
        assert_eq!(result.misses[0].key, "far east");
        assert_eq!(result.misses[0].flight_count, 1);
    }

    #[test]
    fn test_duplicate_catalog_id_is_diagnosed() {
        let mut regions = catalog();
        regions.push(region(2, "Western"));
        let index = RegionIndex::build(&regions);

        assert_eq!(index.len(), 4);
        assert_eq!(index.catalog_diagnostics().len(), 1);
        let diagnostic = &index.catalog_diagnostics()[0];
        assert_eq!(diagnostic.reason, JoinFailure::DuplicateCatalogId);
        assert_eq!(diagnostic.key, "Western");
        assert_eq!(diagnostic.region_id, Some(2));

        // first region with the id wins; the duplicate stays reachable by name
        assert_eq!(index.resolve_id(2).unwrap().name, "Northern");
        assert_eq!(index.resolve_name("western").unwrap().region_id, 2);
    }
}
