//! Per-region flight counting.
//!
//! A flight counts once for every distinct region it touches. A flight that
//! departs and lands in the same region counts once for it. A side whose
//! region is missing is skipped while the other side still counts.
//!
//! Accumulation is a plain sum per key, so the result does not depend on the
//! order flights are visited in (which is what makes the parallel variant safe).

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::join::normalize_name;
use crate::FlightRecord;

/// How flights are attributed to regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKeying {
    /// By normalized region name
    #[default]
    Name,
    /// By region id
    Id,
}

/// Key of an aggregate count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionIdentity {
    Id(i64),
    /// Normalized name
    Name(String),
}

impl fmt::Display for RegionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionIdentity::Id(id) => write!(f, "#{}", id),
            RegionIdentity::Name(name) => f.write_str(name),
        }
    }
}

impl RegionIdentity {
    fn from_id(id: Option<i64>) -> Option<Self> {
        id.filter(|&id| id > 0).map(RegionIdentity::Id)
    }

    fn from_name(name: Option<&str>) -> Option<Self> {
        let normalized = normalize_name(name?);
        if normalized.is_empty() {
            None
        } else {
            Some(RegionIdentity::Name(normalized))
        }
    }
}

/// The distinct region identities a flight touches (zero, one or two).
fn flight_identities(
    flight: &FlightRecord,
    keying: RegionKeying,
) -> (Option<RegionIdentity>, Option<RegionIdentity>) {
    let (departure, arrival) = match keying {
        RegionKeying::Id => (
            RegionIdentity::from_id(flight.departure_region_id),
            RegionIdentity::from_id(flight.arrival_region_id),
        ),
        RegionKeying::Name => (
            RegionIdentity::from_name(flight.departure_region_name.as_deref()),
            RegionIdentity::from_name(flight.arrival_region_name.as_deref()),
        ),
    };

    if departure.is_some() && departure == arrival {
        (departure, None)
    } else {
        (departure, arrival)
    }
}

fn accumulate(
    counts: &mut HashMap<RegionIdentity, u32>,
    flight: &FlightRecord,
    keying: RegionKeying,
) {
    let (first, second) = flight_identities(flight, keying);
    for identity in [first, second].into_iter().flatten() {
        *counts.entry(identity).or_insert(0) += 1;
    }
}

/// Count flights per region.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use flight_regions::{aggregate_flights, FlightRecord, RegionIdentity, RegionKeying};
///
/// let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let flights = vec![
///     FlightRecord::between(1, d, (1, "A"), (2, "B")),
///     FlightRecord::between(2, d, (1, "A"), (1, "A")),
/// ];
/// let counts = aggregate_flights(&flights, RegionKeying::Id);
/// assert_eq!(counts[&RegionIdentity::Id(1)], 2);
/// assert_eq!(counts[&RegionIdentity::Id(2)], 1);
/// ```
pub fn aggregate_flights(
    flights: &[FlightRecord],
    keying: RegionKeying,
) -> HashMap<RegionIdentity, u32> {
    let mut counts = HashMap::new();
    for flight in flights {
        accumulate(&mut counts, flight, keying);
    }
    counts
}

/// Count flights per region using parallel processing.
/// Falls back to sequential counting below `threshold` flights.
#[cfg(feature = "parallel")]
pub fn aggregate_flights_parallel(
    flights: &[FlightRecord],
    keying: RegionKeying,
    threshold: usize,
) -> HashMap<RegionIdentity, u32> {
    if flights.len() < threshold {
        return aggregate_flights(flights, keying);
    }

    flights
        .par_iter()
        .fold(HashMap::new, |mut counts, flight| {
            accumulate(&mut counts, flight, keying);
            counts
        })
        .reduce(HashMap::new, |mut left, right| {
            for (identity, count) in right {
                *left.entry(identity).or_insert(0) += count;
            }
            left
        })
}

/// Overall statistics of a flight list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSummary {
    pub total_flights: u64,
    /// Distinct drone ids among flights that carry one
    pub unique_drones: u64,
    pub total_duration_minutes: u64,
    pub average_duration_minutes: f64,
    pub first_flight_date: Option<NaiveDate>,
    pub last_flight_date: Option<NaiveDate>,
}

/// Summarize a flight list.
pub fn summarize(flights: &[FlightRecord]) -> FlightSummary {
    if flights.is_empty() {
        return FlightSummary::default();
    }

    let drones: HashSet<i64> = flights.iter().filter_map(|f| f.drone_id).collect();
    let total_duration: u64 = flights.iter().map(|f| f.duration_minutes as u64).sum();

    FlightSummary {
        total_flights: flights.len() as u64,
        unique_drones: drones.len() as u64,
        total_duration_minutes: total_duration,
        average_duration_minutes: total_duration as f64 / flights.len() as f64,
        first_flight_date: flights.iter().map(|f| f.flight_date).min(),
        last_flight_date: flights.iter().map(|f| f.flight_date).max(),
    }
}
