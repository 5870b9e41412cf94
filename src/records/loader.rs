use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::{parse_records, Record};
use crate::error::{CarparkError, Result};
use crate::models::{
    AvailabilityRecord, AvailabilitySnapshot, CarparkReference, Coordinates, ADDRESS,
    CARPARK_NUMBER, CARPARK_TYPE, LOTS_AVAILABLE, PARKING_SYSTEM_TYPE, TOTAL_LOTS, X_COORD,
    Y_COORD,
};

/// Read and parse a carpark reference table (header row, then one carpark per row)
pub fn load_reference(path: &Path) -> Result<Vec<CarparkReference>> {
    let text = fs::read_to_string(path).map_err(|e| CarparkError::from_io(path, e))?;
    let carparks = parse_reference(&text)?;
    info!(path = %path.display(), count = carparks.len(), "loaded carpark reference table");
    Ok(carparks)
}

/// Rows without a carpark number are skipped. Coordinates that are absent or
/// unreadable leave the carpark without a position.
pub fn parse_reference(text: &str) -> Result<Vec<CarparkReference>> {
    let set = parse_records(text, 1)?;
    let carparks = set
        .records
        .iter()
        .filter_map(|record| match reference_from_record(record) {
            Ok(carpark) => Some(carpark),
            Err(err) => {
                warn!("skipping reference row: {err}");
                None
            }
        })
        .collect();
    Ok(carparks)
}

fn reference_from_record(record: &Record) -> Result<CarparkReference> {
    let carpark_number = require_key(record)?;
    let optional = |key: &str| {
        record
            .get(key)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    };

    let coordinates = match (
        parse_coordinate(record, X_COORD),
        parse_coordinate(record, Y_COORD),
    ) {
        (Some(x), Some(y)) => Some(Coordinates::new(x, y)),
        _ => None,
    };

    Ok(CarparkReference {
        carpark_number,
        carpark_type: optional(CARPARK_TYPE),
        address: optional(ADDRESS),
        parking_system_type: optional(PARKING_SYSTEM_TYPE),
        coordinates,
    })
}

/// Read an availability file: timestamp line, header line, then data rows
pub fn load_availability(path: &Path) -> Result<AvailabilitySnapshot> {
    let text = fs::read_to_string(path).map_err(|e| CarparkError::from_io(path, e))?;
    let snapshot = parse_availability(&text)?;
    info!(
        path = %path.display(),
        timestamp = %snapshot.display_timestamp(),
        count = snapshot.records.len(),
        skipped = snapshot.defects.len(),
        "loaded availability snapshot"
    );
    Ok(snapshot)
}

/// Unreadable data rows are left out of `records` and kept in `defects`.
/// A missing timestamp or a header without the lot columns fails the load.
pub fn parse_availability(text: &str) -> Result<AvailabilitySnapshot> {
    if text.is_empty() {
        return Err(CarparkError::InvalidArgument(
            "availability file is empty".into(),
        ));
    }
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let timestamp = first.strip_suffix('\r').unwrap_or(first).to_owned();

    let set = parse_records(rest, 2)?;
    for required in [CARPARK_NUMBER, TOTAL_LOTS, LOTS_AVAILABLE] {
        if !set.headers.iter().any(|h| h == required) {
            return Err(CarparkError::InvalidArgument(format!(
                "availability header must contain '{required}'"
            )));
        }
    }
    debug!(headers = ?set.headers, "availability header accepted");

    let mut records = Vec::with_capacity(set.records.len());
    let mut defects = Vec::new();
    for record in &set.records {
        match availability_from_record(record) {
            Ok(parsed) => records.push(parsed),
            Err(err) => {
                warn!("skipping availability row: {err}");
                defects.push(err);
            }
        }
    }

    Ok(AvailabilitySnapshot {
        timestamp,
        records,
        defects,
    })
}

fn availability_from_record(record: &Record) -> Result<AvailabilityRecord> {
    Ok(AvailabilityRecord {
        carpark_number: require_key(record)?,
        total_lots: parse_count(record, TOTAL_LOTS)?,
        lots_available: parse_count(record, LOTS_AVAILABLE)?,
    })
}

fn require_key(record: &Record) -> Result<String> {
    match record.get(CARPARK_NUMBER) {
        Some(number) if !number.is_empty() => Ok(number.to_owned()),
        other => Err(CarparkError::Malformed {
            line: record.line,
            field: CARPARK_NUMBER,
            expected: "carpark number",
            raw: other.unwrap_or_default().to_owned(),
        }),
    }
}

fn parse_count(record: &Record, field: &'static str) -> Result<u32> {
    let raw = record.get(field).unwrap_or_default();
    raw.parse().map_err(|_| CarparkError::Malformed {
        line: record.line,
        field,
        expected: "non-negative integer",
        raw: raw.to_owned(),
    })
}

fn parse_coordinate(record: &Record, field: &'static str) -> Option<f64> {
    let raw = record.get(field)?;
    let value = raw.parse::<f64>().ok().filter(|v| v.is_finite());
    if value.is_none() && !raw.is_empty() {
        debug!(line = record.line, field, raw, "unreadable coordinate");
    }
    value
}
