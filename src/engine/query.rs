//! Read-only queries over reference and enriched availability records.

use crate::error::{CarparkError, Result};
use crate::models::{CarparkReference, Coordinates, EnrichedRecord, BASEMENT_CAR_PARK};

pub fn count<T>(records: &[T]) -> usize {
    records.len()
}

pub fn basement_carparks(carparks: &[CarparkReference]) -> Vec<&CarparkReference> {
    carparks
        .iter()
        .filter(|c| c.carpark_type.as_deref() == Some(BASEMENT_CAR_PARK))
        .collect()
}

pub fn without_available_lots(records: &[EnrichedRecord]) -> Vec<&EnrichedRecord> {
    records.iter().filter(|r| r.lots_available == 0).collect()
}

/// Records whose free-lot percentage is strictly above `threshold`.
///
/// `threshold` must lie within `[0, 100]`.
pub fn above_percentage(
    records: &[EnrichedRecord],
    threshold: f64,
) -> Result<Vec<&EnrichedRecord>> {
    if !(0.0..=100.0).contains(&threshold) {
        return Err(CarparkError::InvalidArgument(format!(
            "percentage must be between 0 and 100, got {threshold}"
        )));
    }
    Ok(records
        .iter()
        .filter(|r| r.percentage.value() > threshold)
        .collect())
}

/// Records whose address contains `needle`, ignoring case.
///
/// An empty result is reported as [`CarparkError::NoMatch`].
pub fn at_location<'a>(
    records: &'a [EnrichedRecord],
    needle: &str,
) -> Result<Vec<&'a EnrichedRecord>> {
    let needle_lower = needle.to_lowercase();
    let matched: Vec<_> = records
        .iter()
        .filter(|r| r.address.to_lowercase().contains(&needle_lower))
        .collect();
    if matched.is_empty() {
        return Err(CarparkError::NoMatch(needle.to_owned()));
    }
    Ok(matched)
}

/// The record with the most total lots; the first one seen wins a tie.
///
/// The running maximum starts at zero, so a sequence where every carpark has
/// zero lots yields its first record.
pub fn most_lots(records: &[EnrichedRecord]) -> Result<&EnrichedRecord> {
    let first = records.first().ok_or(CarparkError::Empty)?;
    let mut best = first;
    let mut most = 0;
    for record in records {
        if record.total_lots > most {
            most = record.total_lots;
            best = record;
        }
    }
    Ok(best)
}

/// Arithmetic mean of a set of points
pub fn centroid(points: &[Coordinates]) -> Option<Coordinates> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Coordinates::new(sx / n, sy / n))
}

/// A carpark ranked by its distance to the centroid of a search
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCarpark<'a> {
    pub carpark: &'a CarparkReference,
    pub distance: f64,
}

/// Result of a nearest-carpark search
#[derive(Debug, Clone, PartialEq)]
pub struct NearestCarparks<'a> {
    pub centre: Coordinates,
    pub ranked: Vec<RankedCarpark<'a>>,
}

/// Carparks whose address contains `needle` (ignoring case), sorted by
/// ascending distance to the centroid of their coordinates.
///
/// Equal distances keep their input order. A matched carpark without
/// coordinates fails the whole search.
pub fn nearest_to_address<'a>(
    carparks: &'a [CarparkReference],
    needle: &str,
) -> Result<NearestCarparks<'a>> {
    let needle_lower = needle.to_lowercase();
    let matched = carparks
        .iter()
        .filter(|c| {
            c.address
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&needle_lower))
        })
        .map(|c| c.require_coordinates().map(|point| (c, point)))
        .collect::<Result<Vec<_>>>()?;

    let points: Vec<Coordinates> = matched.iter().map(|(_, p)| *p).collect();
    let centre = centroid(&points).ok_or_else(|| CarparkError::NoMatch(needle.to_owned()))?;

    let mut ranked: Vec<RankedCarpark<'a>> = matched
        .into_iter()
        .map(|(carpark, point)| RankedCarpark {
            carpark,
            distance: point.distance_to(&centre),
        })
        .collect();
    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    Ok(NearestCarparks { centre, ranked })
}
