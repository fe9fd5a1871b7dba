//! Date-range and region filtering of flight records.
//!
//! Criteria are validated before any flight is looked at. Every violated
//! constraint produces its own message so the host can mark several fields
//! at once.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{FilterField, Result, ValidationError, ValidationErrors};
use crate::FlightRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Filter criteria as the host UI holds them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub region_id: Option<i64>,
}

/// Unparsed form input: dates still as `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilterInput {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub region_id: Option<i64>,
}

impl FilterCriteria {
    /// Criteria for an inclusive date range.
    pub fn between(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            region_id: None,
        }
    }

    pub fn with_region(mut self, region_id: i64) -> Self {
        self.region_id = Some(region_id);
        self
    }

    /// True when no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.region_id.is_none()
    }

    /// Check every constraint, collecting one message per violation.
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        self.collect_violations(&mut errors);
        errors.into_result()
    }

    fn collect_violations(&self, errors: &mut ValidationErrors) {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.push(ValidationError::new(
                    FilterField::EndDate,
                    format!(
                        "End date {} cannot be earlier than start date {}",
                        end, start
                    ),
                ));
            }
        }
        if let Some(region_id) = self.region_id {
            if region_id <= 0 {
                errors.push(ValidationError::new(
                    FilterField::RegionId,
                    format!("Region id must be a positive number, got {}", region_id),
                ));
            }
        }
    }

    /// Parse raw form input. Blank date strings count as absent.
    ///
    /// Malformed dates are reported alongside range and region problems.
    pub fn parse(raw: &RawFilterInput) -> Result<Self> {
        let mut errors = ValidationErrors::new();
        let start_date =
            parse_date(raw.start_date.as_deref(), FilterField::StartDate, &mut errors);
        let end_date = parse_date(raw.end_date.as_deref(), FilterField::EndDate, &mut errors);

        let criteria = Self {
            start_date,
            end_date,
            region_id: raw.region_id,
        };
        criteria.collect_violations(&mut errors);
        errors.into_result().map(|_| criteria)
    }

    /// Check if a single flight satisfies every set predicate.
    pub fn matches(&self, flight: &FlightRecord) -> bool {
        if let Some(start) = self.start_date {
            if flight.flight_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if flight.flight_date > end {
                return false;
            }
        }
        if let Some(region_id) = self.region_id {
            if !flight.touches_region(region_id) {
                return false;
            }
        }
        true
    }
}

fn parse_date(
    value: Option<&str>,
    field: FilterField,
    errors: &mut ValidationErrors,
) -> Option<NaiveDate> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            let label = if field == FilterField::StartDate {
                "Start date"
            } else {
                "End date"
            };
            errors.push(ValidationError::new(
                field,
                format!("{} '{}' is not a valid YYYY-MM-DD date", label, value),
            ));
            None
        }
    }
}

/// Apply criteria to a flight list.
///
/// Validates first; on success returns the passing flights in their original
/// relative order. The input is never modified.
pub fn apply_filter(
    flights: &[FlightRecord],
    criteria: &FilterCriteria,
) -> Result<Vec<FlightRecord>> {
    criteria.validate()?;

    if criteria.is_empty() {
        return Ok(flights.to_vec());
    }

    let filtered: Vec<FlightRecord> = flights
        .iter()
        .filter(|f| criteria.matches(f))
        .cloned()
        .collect();

    debug!(
        "[Filter] {} of {} flights pass {:?}",
        filtered.len(),
        flights.len(),
        criteria
    );
    Ok(filtered)
}
