use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CarparkError, Result};

pub const CARPARK_NUMBER: &str = "Carpark Number";
pub const CARPARK_TYPE: &str = "Carpark Type";
pub const PARKING_SYSTEM_TYPE: &str = "Type of Parking System";
pub const ADDRESS: &str = "Address";
pub const X_COORD: &str = "X";
pub const Y_COORD: &str = "Y";
pub const TOTAL_LOTS: &str = "Total Lots";
pub const LOTS_AVAILABLE: &str = "Lots Available";
pub const PERCENTAGE: &str = "Percentage";

pub const BASEMENT_CAR_PARK: &str = "BASEMENT CAR PARK";

/// Planar (SVY21) position of a carpark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Static description of a carpark, loaded once from the reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarparkReference {
    pub carpark_number: String,
    pub carpark_type: Option<String>,
    pub address: Option<String>,
    pub parking_system_type: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl CarparkReference {
    pub fn require_coordinates(&self) -> Result<Coordinates> {
        self.coordinates.ok_or_else(|| CarparkError::MissingField {
            carpark: self.carpark_number.clone(),
            field: "X/Y",
        })
    }
}

/// Lot counts for one carpark at the time of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub carpark_number: String,
    pub total_lots: u32,
    pub lots_available: u32,
}

/// A freshly loaded availability snapshot that has not been joined yet
#[derive(Debug)]
pub struct AvailabilitySnapshot {
    /// Raw first line of the availability file, stored untouched
    pub timestamp: String,
    pub records: Vec<AvailabilityRecord>,
    /// Rows that could not be read, with the reason
    pub defects: Vec<CarparkError>,
}

impl AvailabilitySnapshot {
    pub fn display_timestamp(&self) -> &str {
        display_timestamp(&self.timestamp)
    }
}

/// Share of free lots, rounded to one decimal place
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Percentage(f64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0.0);

    pub fn from_ratio(part: u32, whole: u32) -> Option<Self> {
        if whole == 0 {
            return None;
        }
        let raw = f64::from(part) / f64::from(whole) * 100.0;
        Some(Self((raw * 10.0).round_ties_even() / 10.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// One availability record joined with its reference address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub carpark_number: String,
    pub total_lots: u32,
    pub lots_available: u32,
    pub percentage: Percentage,
    /// Empty when no reference record shares the carpark number
    pub address: String,
}

/// Snapshot after the one-way enrichment step
#[derive(Debug)]
pub struct EnrichedSnapshot {
    pub timestamp: String,
    pub records: Vec<EnrichedRecord>,
    /// Records left out of `records`, with the reason
    pub defects: Vec<CarparkError>,
}

impl EnrichedSnapshot {
    pub fn display_timestamp(&self) -> &str {
        display_timestamp(&self.timestamp)
    }
}

/// Timestamps are kept raw; only trailing line noise is hidden on display.
pub fn display_timestamp(raw: &str) -> &str {
    raw.trim_end_matches(|c: char| c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_one_decimal() {
        let pct = Percentage::from_ratio(1, 3).unwrap();
        assert_eq!(pct.to_string(), "33.3");
        assert_eq!(Percentage::from_ratio(25, 100).unwrap().to_string(), "25.0");
        assert_eq!(Percentage::from_ratio(2, 3).unwrap().to_string(), "66.7");
    }

    #[test]
    fn percentage_halves_round_to_even() {
        // 1/400 is exactly 0.25%
        assert_eq!(Percentage::from_ratio(1, 400).unwrap().to_string(), "0.2");
        assert_eq!(Percentage::from_ratio(3, 8).unwrap().to_string(), "37.5");
    }

    #[test]
    fn percentage_rejects_zero_total() {
        assert!(Percentage::from_ratio(0, 0).is_none());
        assert!(Percentage::from_ratio(5, 0).is_none());
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn display_timestamp_trims_trailing_noise_only() {
        assert_eq!(display_timestamp("2024-01-01 10:00:00\r"), "2024-01-01 10:00:00");
        assert_eq!(display_timestamp("2024-01-01 10:00:00"), "2024-01-01 10:00:00");
    }

    #[test]
    fn missing_coordinates_are_reported_by_field() {
        let carpark = CarparkReference {
            carpark_number: "A1".into(),
            carpark_type: None,
            address: None,
            parking_system_type: None,
            coordinates: None,
        };
        let err = carpark.require_coordinates().unwrap_err();
        assert_eq!(err.to_string(), "carpark A1 has no 'X/Y'");
    }
}
