//! Count to color tier classification.
//!
//! Fixed, upper-inclusive threshold table:
//!
//! | count   | tier        |
//! |---------|-------------|
//! | 0       | `None`      |
//! | 1-10    | `Low`       |
//! | 11-50   | `Medium`    |
//! | 51-100  | `High`      |
//! | > 100   | `VeryHigh`  |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FlightMapError, Result};

/// Upper bound (inclusive) of each tier below `VeryHigh`.
const TIER_UPPER_BOUNDS: [(i64, ColorTier); 4] = [
    (0, ColorTier::None),
    (10, ColorTier::Low),
    (50, ColorTier::Medium),
    (100, ColorTier::High),
];

/// Discrete visual bucket of a region's flight count, ordered from empty to busiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorTier {
    None,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ColorTier {
    pub const ALL: [ColorTier; 5] = [
        ColorTier::None,
        ColorTier::Low,
        ColorTier::Medium,
        ColorTier::High,
        ColorTier::VeryHigh,
    ];

    /// Fill color of the tier as `#rrggbb`.
    pub fn color_hex(&self) -> &'static str {
        match self {
            ColorTier::None => "#cccccc",
            ColorTier::Low => "#67b7dc",
            ColorTier::Medium => "#3498db",
            ColorTier::High => "#2980b9",
            ColorTier::VeryHigh => "#1c4e80",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorTier::None => "NONE",
            ColorTier::Low => "LOW",
            ColorTier::Medium => "MEDIUM",
            ColorTier::High => "HIGH",
            ColorTier::VeryHigh => "VERY_HIGH",
        }
    }
}

impl fmt::Display for ColorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a count.
///
/// Negative counts are rejected with [`FlightMapError::Domain`]; they mean the
/// aggregation upstream is broken and are never clamped.
///
/// # Example
/// ```
/// use flight_regions::{bin, ColorTier};
///
/// assert_eq!(bin(0).unwrap(), ColorTier::None);
/// assert_eq!(bin(11).unwrap(), ColorTier::Medium);
/// assert_eq!(bin(101).unwrap(), ColorTier::VeryHigh);
/// assert!(bin(-1).is_err());
/// ```
pub fn bin(count: i64) -> Result<ColorTier> {
    if count < 0 {
        return Err(FlightMapError::Domain { count });
    }
    Ok(TIER_UPPER_BOUNDS
        .iter()
        .find(|(upper, _)| count <= *upper)
        .map(|&(_, tier)| tier)
        .unwrap_or(ColorTier::VeryHigh))
}
