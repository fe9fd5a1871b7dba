//! Unified error handling for the flight-regions library.
//!
//! Only conditions that stop a refresh are errors. A region name that cannot be
//! joined against the catalog is reported through
//! [`JoinDiagnostic`](crate::join::JoinDiagnostic) instead and never shows up here.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Filter field a validation message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    StartDate,
    EndDate,
    RegionId,
}

impl FilterField {
    /// Field name as the host UI spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::StartDate => "startDate",
            FilterField::EndDate => "endDate",
            FilterField::RegionId => "regionId",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violated filter constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub field: FilterField,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: FilterField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All violated constraints of a single criteria value, one entry per field problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Human-readable messages in the order the checks ran.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|e| e.message.clone()).collect()
    }

    /// Whether any message refers to `field`.
    pub fn has_field(&self, field: FilterField) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected list as an error.
    pub fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(FlightMapError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Unified error type for flight-regions operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlightMapError {
    /// Filter criteria are malformed; the refresh did not run
    #[error("Invalid filter criteria: {0}")]
    Validation(ValidationErrors),
    /// A negative count reached the color scale (aggregation defect upstream)
    #[error("Count {count} is outside the color scale domain (must be >= 0)")]
    Domain { count: i64 },
    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl FlightMapError {
    /// Field-level messages when this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            FlightMapError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type alias for flight-regions operations.
pub type Result<T> = std::result::Result<T, FlightMapError>;

/// Extension trait for converting serde failures into configuration errors.
pub trait ConfigResultExt<T> {
    fn or_config_error(self, context: &str) -> Result<T>;
}

impl<T> ConfigResultExt<T> for std::result::Result<T, serde_json::Error> {
    fn or_config_error(self, context: &str) -> Result<T> {
        self.map_err(|e| FlightMapError::Config {
            message: format!("{}: {}", context, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlightMapError::Domain { count: -3 };
        assert!(err.to_string().contains("-3"));

        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::new(FilterField::EndDate, "end before start"));
        errors.push(ValidationError::new(FilterField::RegionId, "must be positive"));
        let err = FlightMapError::Validation(errors);
        let text = err.to_string();
        assert!(text.contains("endDate: end before start"));
        assert!(text.contains("regionId: must be positive"));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::new(FilterField::StartDate, "bad"));
        let result = errors.into_result();
        let err = result.unwrap_err();
        let list = err.validation_errors().unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.has_field(FilterField::StartDate));
        assert!(!list.has_field(FilterField::EndDate));
    }

    #[test]
    fn test_config_ext() {
        let parsed: std::result::Result<u32, serde_json::Error> = serde_json::from_str("nope");
        let result = parsed.or_config_error("binding config");
        assert!(matches!(result, Err(FlightMapError::Config { .. })));
    }
}
