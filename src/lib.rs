//! # Flight Regions
//!
//! Per-region drone flight statistics bound to map geometry.
//!
//! This library provides:
//! - Date/region filtering of flight records with field-level validation
//! - Per-region flight counts that never double count round trips
//! - Name-based joining of counts against a region catalog
//! - A fixed five-tier color scale and per-feature visual state for a map renderer
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel aggregation with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use flight_regions::{
//!     BindingConfig, FilterCriteria, FlightRecord, GeometryRef, MapBindingController, Region,
//! };
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let flights = vec![FlightRecord::between(1, date, (1, "Moscow"), (2, "Tver"))];
//! let catalog = vec![
//!     Region::new(1, "Moscow", 2561.5, GeometryRef::new("RU-MOW")),
//!     Region::new(2, "Tver", 84201.0, GeometryRef::new("RU-TVE")),
//! ];
//!
//! let mut controller = MapBindingController::new(BindingConfig::default());
//! let outcome = controller
//!     .refresh(&flights, &FilterCriteria::default(), &catalog)
//!     .unwrap();
//! assert_eq!(outcome.visuals.len(), 2);
//! assert!(outcome.diagnostics.is_empty());
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{FilterField, FlightMapError, Result, ValidationError, ValidationErrors};

// Date-range / region filtering
pub mod filter;
pub use filter::{apply_filter, FilterCriteria, RawFilterInput};

// Per-region flight counting
pub mod aggregate;
#[cfg(feature = "parallel")]
pub use aggregate::aggregate_flights_parallel;
pub use aggregate::{aggregate_flights, summarize, FlightSummary, RegionIdentity, RegionKeying};

// Name normalization and catalog join
pub mod join;
pub use join::{normalize_name, JoinDiagnostic, JoinFailure, RegionIndex};

// Count -> color tier
pub mod binning;
pub use binning::{bin, ColorTier};

// Refresh orchestration and click routing
pub mod controller;
pub use controller::{
    FeatureBinding, MapBindingController, RefreshOutcome, RegionSelected, RegionVisualState,
};

// Ranked region report
pub mod report;
pub use report::{top_regions, RegionRanking};

// ============================================================================
// Core Types
// ============================================================================

/// Opaque handle to a region's polygon, owned by the rendering collaborator.
///
/// The pipeline carries it through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryRef(String);

impl GeometryRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single drone flight as delivered by the fetch/validation layer.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use flight_regions::FlightRecord;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
/// let flight = FlightRecord::between(3, date, (2, "North"), (2, "North"));
/// assert!(flight.is_round_trip_by_id());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    pub flight_id: i64,
    #[serde(default)]
    pub drone_id: Option<i64>,
    /// Calendar date of the flight (`YYYY-MM-DD`)
    pub flight_date: NaiveDate,
    #[serde(default)]
    pub departure_region_id: Option<i64>,
    #[serde(default)]
    pub arrival_region_id: Option<i64>,
    #[serde(default)]
    pub departure_region_name: Option<String>,
    #[serde(default)]
    pub arrival_region_name: Option<String>,
    /// Flight duration in minutes
    #[serde(default)]
    pub duration_minutes: u32,
}

impl FlightRecord {
    /// Create a flight between two `(region_id, region_name)` endpoints.
    pub fn between(
        flight_id: i64,
        flight_date: NaiveDate,
        departure: (i64, &str),
        arrival: (i64, &str),
    ) -> Self {
        Self {
            flight_id,
            drone_id: None,
            flight_date,
            departure_region_id: Some(departure.0),
            arrival_region_id: Some(arrival.0),
            departure_region_name: Some(departure.1.to_string()),
            arrival_region_name: Some(arrival.1.to_string()),
            duration_minutes: 0,
        }
    }

    pub fn with_drone(mut self, drone_id: i64) -> Self {
        self.drone_id = Some(drone_id);
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    /// Check if the flight starts and ends in the same region (by id).
    pub fn is_round_trip_by_id(&self) -> bool {
        matches!(
            (self.departure_region_id, self.arrival_region_id),
            (Some(dep), Some(arr)) if dep == arr
        )
    }

    /// Check if the flight touches the given region on either side.
    pub fn touches_region(&self, region_id: i64) -> bool {
        self.departure_region_id == Some(region_id) || self.arrival_region_id == Some(region_id)
    }
}

/// A geographic region of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub region_id: i64,
    /// Display name, also the join key against map geometry
    pub name: String,
    pub area_km2: f64,
    /// Flight count, absent until a refresh computes it
    #[serde(default)]
    pub total_flights: Option<u32>,
    #[serde(rename = "geometry")]
    pub geometry_ref: GeometryRef,
}

impl Region {
    pub fn new(region_id: i64, name: &str, area_km2: f64, geometry_ref: GeometryRef) -> Self {
        Self {
            region_id,
            name: name.to_string(),
            area_km2,
            total_flights: None,
            geometry_ref,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the binding pipeline.
///
/// Can be loaded from the host's JSON settings:
/// ```
/// use flight_regions::{BindingConfig, RegionKeying};
///
/// let config = BindingConfig::from_json(r#"{"keying": "id", "topRegionsLimit": 5}"#).unwrap();
/// assert_eq!(config.keying, RegionKeying::Id);
/// assert_eq!(config.top_regions_limit, 5);
/// assert_eq!(config.tooltip_count_label, "Flights");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BindingConfig {
    /// How flights are attributed to regions before the join.
    /// Default: by normalized region name (geometry features are keyed by name)
    pub keying: RegionKeying,

    /// Label used for the count line of a tooltip.
    /// Default: "Flights"
    pub tooltip_count_label: String,

    /// Whether regions with zero flights still react to clicks.
    /// Default: true
    pub interactive_empty_regions: bool,

    /// Number of regions in the ranked report.
    /// Default: 10
    pub top_regions_limit: usize,

    /// Flight count from which aggregation switches to rayon (`parallel` feature only).
    /// Default: 10_000
    pub parallel_threshold: usize,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            keying: RegionKeying::Name,
            tooltip_count_label: "Flights".to_string(),
            interactive_empty_regions: true,
            top_regions_limit: 10,
            parallel_threshold: 10_000,
        }
    }
}

impl BindingConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        use crate::error::ConfigResultExt;
        serde_json::from_str(json).or_config_error("Invalid binding configuration")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_flight_deserializes_from_fetch_json() {
        let json = r#"{
            "flightId": 7,
            "droneId": 101,
            "flightDate": "2024-01-15",
            "departureRegionId": 1,
            "arrivalRegionId": null,
            "departureRegionName": "Central",
            "durationMinutes": 135
        }"#;
        let flight: FlightRecord = serde_json::from_str(json).unwrap();
        assert_eq!(flight.flight_id, 7);
        assert_eq!(flight.flight_date, date(15));
        assert_eq!(flight.arrival_region_id, None);
        assert_eq!(flight.arrival_region_name, None);
        assert_eq!(flight.duration_minutes, 135);
    }

    #[test]
    fn test_region_deserializes_with_null_total() {
        let json = r#"{"regionId": 3, "name": "South", "areaKm2": 120.5,
                       "geometry": "RU-SOU", "totalFlights": null}"#;
        let region: Region = serde_json::from_str(json).unwrap();
        assert_eq!(region.region_id, 3);
        assert_eq!(region.total_flights, None);
        assert_eq!(region.geometry_ref.as_str(), "RU-SOU");
    }

    #[test]
    fn test_round_trip_detection() {
        let loop_flight = FlightRecord::between(1, date(1), (4, "A"), (4, "A"));
        let plain = FlightRecord::between(2, date(1), (4, "A"), (5, "B"));
        assert!(loop_flight.is_round_trip_by_id());
        assert!(!plain.is_round_trip_by_id());
        assert!(plain.touches_region(5));
        assert!(!plain.touches_region(6));
    }

    #[test]
    fn test_config_defaults_and_errors() {
        let config = BindingConfig::from_json("{}").unwrap();
        assert_eq!(config, BindingConfig::default());
        assert!(matches!(
            BindingConfig::from_json("{\"keying\": 3}"),
            Err(FlightMapError::Config { .. })
        ));
    }
}
