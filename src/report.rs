//! Ranked region report ("top regions by flights").

use serde::{Deserialize, Serialize};

use crate::Region;

/// One row of the ranked report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRanking {
    /// 1 = busiest
    pub rank: u32,
    pub region_id: i64,
    pub name: String,
    pub total_flights: u32,
    /// Flights per 1,000 km², when the region has a positive area
    pub flights_per_1000_km2: Option<f64>,
}

/// Rank regions by flight count, busiest first, ties by name.
///
/// Regions without flights (or without a computed total) are left out.
pub fn top_regions(rows: &[Region], limit: usize) -> Vec<RegionRanking> {
    let mut ranked: Vec<(&Region, u32)> = rows
        .iter()
        .filter_map(|r| r.total_flights.filter(|&n| n > 0).map(|n| (r, n)))
        .collect();

    ranked.sort_by(|(a, a_count), (b, b_count)| {
        b_count
            .cmp(a_count)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.region_id.cmp(&b.region_id))
    });

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (region, count))| RegionRanking {
            rank: i as u32 + 1,
            region_id: region.region_id,
            name: region.name.clone(),
            total_flights: count,
            flights_per_1000_km2: (region.area_km2 > 0.0)
                .then(|| count as f64 * 1000.0 / region.area_km2),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeometryRef;

    fn row(id: i64, name: &str, area: f64, total: Option<u32>) -> Region {
        let mut region = Region::new(id, name, area, GeometryRef::new(name));
        region.total_flights = total;
        region
    }

    #[test]
    fn test_ranking_order_and_limit() {
        let rows = vec![
            row(1, "Tver", 500.0, Some(3)),
            row(2, "Moscow", 2000.0, Some(7)),
            row(3, "Kaluga", 0.0, Some(3)),
            row(4, "Tula", 100.0, Some(0)),
            row(5, "Ryazan", 100.0, None),
        ];

        let top = top_regions(&rows, 10);
        let names: Vec<&str> = top.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Moscow", "Kaluga", "Tver"]);
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[2].rank, 3);
        assert_eq!(top[0].flights_per_1000_km2, Some(3.5));
        assert_eq!(top[1].flights_per_1000_km2, None);

        assert_eq!(top_regions(&rows, 1).len(), 1);
        assert!(top_regions(&rows, 0).is_empty());
    }
}
