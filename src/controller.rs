//! # Map Binding Controller
//!
//! Orchestrates one refresh of the map overlay:
//! filter -> aggregate -> join -> bin -> visual state.
//!
//! ## Architecture
//!
//! Each refresh is a synchronous transformation over already-fetched flights
//! and catalog. Its result replaces the previous one wholesale; a refresh that
//! fails leaves the previous state untouched. The controller keeps only what
//! click routing and feature lookups need from the last successful refresh.
//!
//! The controller does no I/O and no locking. Hosts that can start refreshes
//! concurrently must serialize them and use [`RefreshOutcome::generation`] to
//! drop stale results.

use std::collections::HashMap;
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::aggregate::{summarize, FlightSummary, RegionIdentity};
use crate::binning::{bin, ColorTier};
use crate::error::Result;
use crate::filter::{apply_filter, FilterCriteria};
use crate::join::{JoinDiagnostic, JoinFailure, RegionIndex};
use crate::report::{top_regions, RegionRanking};
use crate::{BindingConfig, FlightRecord, Region};

#[cfg(not(feature = "parallel"))]
use crate::aggregate::aggregate_flights;

#[cfg(feature = "parallel")]
use crate::aggregate::aggregate_flights_parallel;

// ============================================================================
// Core Types
// ============================================================================

/// Visual state of one catalog region after a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionVisualState {
    pub region_id: i64,
    /// Key the renderer uses for the geometry feature (the region name)
    pub feature_key: String,
    pub color_tier: ColorTier,
    pub count: u32,
    /// False when count is 0
    pub label_visible: bool,
    pub label_text: Option<String>,
    pub tooltip_text: String,
    pub interactive: bool,
}

/// What the rendering collaborator needs for one geometry feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBinding {
    pub feature_key: String,
    pub color_tier: ColorTier,
    pub label_text: Option<String>,
    pub tooltip_text: String,
    pub interactive: bool,
}

impl From<&RegionVisualState> for FeatureBinding {
    fn from(visual: &RegionVisualState) -> Self {
        Self {
            feature_key: visual.feature_key.clone(),
            color_tier: visual.color_tier,
            label_text: visual.label_text.clone(),
            tooltip_text: visual.tooltip_text.clone(),
            interactive: visual.interactive,
        }
    }
}

/// Complete result of one refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    /// Increments with every successful refresh of the same controller
    pub generation: u64,
    /// One entry per joinable catalog region, in catalog order
    pub visuals: Vec<RegionVisualState>,
    /// Catalog problems first, then unmatched aggregate keys sorted by key
    pub diagnostics: Vec<JoinDiagnostic>,
    /// Catalog regions with `total_flights` filled in, for the paired table view
    pub region_rows: Vec<Region>,
    /// Statistics of the filtered flight list
    pub summary: FlightSummary,
}

impl RefreshOutcome {
    /// Number of aggregate keys that matched no region.
    pub fn unmatched_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.reason == JoinFailure::NotFound)
            .count()
    }

    /// Visual states as JSON for the renderer.
    pub fn visuals_json(&self) -> String {
        serde_json::to_string(&self.visuals).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn diagnostics_json(&self) -> String {
        serde_json::to_string(&self.diagnostics).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Event delivered to the host when a map feature is clicked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionSelected {
    /// Clicked feature is backed by a catalog region (with its current count)
    Region(Region),
    /// Clicked feature has no backing region
    Unresolved(RegionIdentity),
}

type SelectionCallback = Box<dyn FnMut(RegionSelected)>;

// ============================================================================
// Controller
// ============================================================================

/// Binds flight statistics to map features and routes clicks back to the host.
pub struct MapBindingController {
    config: BindingConfig,
    generation: u64,

    // State of the last successful refresh; regions/visuals/rows are parallel
    index: RegionIndex,
    visuals: Vec<RegionVisualState>,
    rows: Vec<Region>,

    on_selected: Option<SelectionCallback>,
}

impl MapBindingController {
    /// Create a controller with the given configuration.
    pub fn new(config: BindingConfig) -> Self {
        Self {
            config,
            generation: 0,
            index: RegionIndex::default(),
            visuals: Vec::new(),
            rows: Vec::new(),
            on_selected: None,
        }
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Recompute the whole visual state from flights, criteria and catalog.
    ///
    /// Fails with a validation error (criteria) or a domain error (negative
    /// count); in both cases nothing of the previous state is changed.
    /// Unmatched names never fail a refresh, they become diagnostics.
    pub fn refresh(
        &mut self,
        flights: &[FlightRecord],
        criteria: &FilterCriteria,
        catalog: &[Region],
    ) -> Result<RefreshOutcome> {
        let filtered = apply_filter(flights, criteria)?;
        let counts = self.aggregate(&filtered);

        let index = RegionIndex::build(catalog);
        let joined = index.join_counts(&counts);

        let mut visuals = Vec::with_capacity(index.len());
        let mut rows = Vec::with_capacity(index.len());
        for (region, &count) in index.regions().iter().zip(&joined.counts) {
            visuals.push(self.visual_state(region, count)?);

            let mut row = region.clone();
            row.total_flights = Some(count);
            rows.push(row);
        }

        let mut diagnostics = index.catalog_diagnostics().to_vec();
        diagnostics.extend(joined.misses);

        self.generation += 1;
        let outcome = RefreshOutcome {
            generation: self.generation,
            visuals,
            diagnostics,
            region_rows: rows,
            summary: summarize(&filtered),
        };

        self.index = index;
        self.visuals = outcome.visuals.clone();
        self.rows = outcome.region_rows.clone();

        info!(
            "[MapBinding] Refresh {}: {} flights -> {} regions, {} diagnostics",
            outcome.generation,
            filtered.len(),
            outcome.visuals.len(),
            outcome.diagnostics.len()
        );
        Ok(outcome)
    }

    #[cfg(not(feature = "parallel"))]
    fn aggregate(&self, flights: &[FlightRecord]) -> HashMap<RegionIdentity, u32> {
        aggregate_flights(flights, self.config.keying)
    }

    #[cfg(feature = "parallel")]
    fn aggregate(&self, flights: &[FlightRecord]) -> HashMap<RegionIdentity, u32> {
        aggregate_flights_parallel(flights, self.config.keying, self.config.parallel_threshold)
    }

    fn visual_state(&self, region: &Region, count: u32) -> Result<RegionVisualState> {
        let color_tier = bin(i64::from(count))?;
        let label_visible = count > 0;

        Ok(RegionVisualState {
            region_id: region.region_id,
            feature_key: region.name.clone(),
            color_tier,
            count,
            label_visible,
            label_text: label_visible.then(|| count.to_string()),
            tooltip_text: format!(
                "{}\n{}: {}",
                region.name, self.config.tooltip_count_label, count
            ),
            interactive: label_visible || self.config.interactive_empty_regions,
        })
    }

    // ========================================================================
    // Renderer Output
    // ========================================================================

    /// Visual states of the last successful refresh.
    pub fn visuals(&self) -> &[RegionVisualState] {
        &self.visuals
    }

    /// Catalog rows with flight totals from the last successful refresh.
    pub fn region_rows(&self) -> &[Region] {
        &self.rows
    }

    /// Bind every geometry feature the renderer knows about.
    ///
    /// Each binding carries the key exactly as the renderer passed it.
    /// Features without a backing region are drawn empty and ignore clicks.
    pub fn feature_bindings<S: AsRef<str>>(&self, feature_keys: &[S]) -> Vec<FeatureBinding> {
        feature_keys
            .iter()
            .map(|key| {
                let key = key.as_ref();
                match self.index.position(&RegionIdentity::Name(key.to_string())) {
                    Some(i) => FeatureBinding {
                        feature_key: key.to_string(),
                        ..FeatureBinding::from(&self.visuals[i])
                    },
                    None => FeatureBinding {
                        feature_key: key.to_string(),
                        color_tier: ColorTier::None,
                        label_text: None,
                        tooltip_text: key.to_string(),
                        interactive: false,
                    },
                }
            })
            .collect()
    }

    /// Feature bindings as JSON (for the renderer bridge).
    pub fn feature_bindings_json<S: AsRef<str>>(&self, feature_keys: &[S]) -> String {
        serde_json::to_string(&self.feature_bindings(feature_keys))
            .unwrap_or_else(|_| "[]".to_string())
    }

    /// Busiest regions of the last refresh, limited by the configured size.
    pub fn top_regions(&self) -> Vec<RegionRanking> {
        top_regions(&self.rows, self.config.top_regions_limit)
    }

    // ========================================================================
    // Click Routing
    // ========================================================================

    /// Register the host's `RegionSelected` handler, replacing any previous one.
    pub fn on_region_selected<F>(&mut self, callback: F)
    where
        F: FnMut(RegionSelected) + 'static,
    {
        self.on_selected = Some(Box::new(callback));
    }

    /// Route a renderer click on the feature of `region_id`.
    pub fn on_feature_click(&mut self, region_id: i64) {
        self.select(RegionIdentity::Id(region_id));
    }

    /// Route a renderer click identified by the feature's key (region name).
    pub fn on_feature_key_click(&mut self, feature_key: &str) {
        self.select(RegionIdentity::Name(feature_key.to_string()));
    }

    fn select(&mut self, identity: RegionIdentity) {
        let event = match self.index.position(&identity) {
            Some(i) => RegionSelected::Region(self.rows[i].clone()),
            None => {
                debug!("[MapBinding] Click on unresolved feature {}", identity);
                RegionSelected::Unresolved(identity)
            }
        };

        match self.on_selected.as_mut() {
            Some(callback) => callback(event),
            None => debug!("[MapBinding] Click ignored, no selection handler"),
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Replace the configuration; takes effect on the next refresh.
    pub fn set_config(&mut self, config: BindingConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Generation of the last successful refresh (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for MapBindingController {
    fn default() -> Self {
        Self::new(BindingConfig::default())
    }
}

impl fmt::Debug for MapBindingController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapBindingController")
            .field("config", &self.config)
            .field("generation", &self.generation)
            .field("regions", &self.visuals.len())
            .field("has_selection_handler", &self.on_selected.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
