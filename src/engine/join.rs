use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{CarparkError, Result};
use crate::models::{
    AvailabilityRecord, AvailabilitySnapshot, CarparkReference, EnrichedRecord, EnrichedSnapshot,
    Percentage,
};

/// Share of free lots for one record.
///
/// Zero free lots is always `0.0`, otherwise `total_lots` must be positive.
pub fn derive_percentage(record: &AvailabilityRecord) -> Result<Percentage> {
    if record.lots_available == 0 {
        return Ok(Percentage::ZERO);
    }
    Percentage::from_ratio(record.lots_available, record.total_lots)
        .ok_or_else(|| CarparkError::ZeroTotalLots(record.carpark_number.clone()))
}

/// Left outer join of availability against reference data.
///
/// Every record keeps its position. Unmatched carparks get an empty address;
/// the first reference record with the same number wins. Records whose
/// percentage cannot be derived are left out and returned as defects.
pub fn enrich(
    availability: Vec<AvailabilityRecord>,
    reference: &[CarparkReference],
) -> (Vec<EnrichedRecord>, Vec<CarparkError>) {
    let mut records = Vec::with_capacity(availability.len());
    let mut defects = Vec::new();

    for record in availability {
        let percentage = match derive_percentage(&record) {
            Ok(pct) => pct,
            Err(err) => {
                warn!(carpark = %record.carpark_number, "skipping record: {err}");
                defects.push(err);
                continue;
            }
        };
        let address = reference
            .iter()
            .find(|carpark| carpark.carpark_number == record.carpark_number)
            .and_then(|carpark| carpark.address.clone())
            .unwrap_or_default();

        records.push(EnrichedRecord {
            carpark_number: record.carpark_number,
            total_lots: record.total_lots,
            lots_available: record.lots_available,
            percentage,
            address,
        });
    }

    (records, defects)
}

impl AvailabilitySnapshot {
    /// One-way transition into the enriched form
    pub fn enrich(self, reference: &[CarparkReference]) -> EnrichedSnapshot {
        let (records, skipped) = enrich(self.records, reference);
        let mut defects = self.defects;
        defects.extend(skipped);
        debug!(
            enriched = records.len(),
            skipped = defects.len(),
            "snapshot enriched"
        );
        EnrichedSnapshot {
            timestamp: self.timestamp,
            records,
            defects,
        }
    }
}

/// Lifecycle of the snapshot held by a session
#[derive(Debug, Default)]
pub enum SnapshotState {
    #[default]
    Empty,
    Raw(AvailabilitySnapshot),
    Enriched(EnrichedSnapshot),
}

impl SnapshotState {
    /// Replace whatever is held with a freshly loaded snapshot
    pub fn load(&mut self, snapshot: AvailabilitySnapshot) {
        *self = Self::Raw(snapshot);
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    /// Enrich on first access; later calls return the stored result.
    pub fn enriched(&mut self, reference: &[CarparkReference]) -> Option<&EnrichedSnapshot> {
        if let Self::Raw(_) = self {
            if let Self::Raw(raw) = std::mem::take(self) {
                *self = Self::Enriched(raw.enrich(reference));
            }
        }
        match &*self {
            Self::Enriched(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Current lot counts keyed by carpark number
pub type LotIndex = HashMap<String, AvailabilityRecord>;

/// A reference record paired with its live lot counts
#[derive(Debug, Clone, PartialEq)]
pub struct LiveCarpark<'a> {
    pub carpark: &'a CarparkReference,
    pub total_lots: u32,
    pub lots_available: u32,
}

/// Pair each selected carpark with live counts, in the order of `numbers`.
///
/// Carparks missing from either the reference table or the live index are
/// left out.
pub fn with_live_lots<'a, I, S>(
    numbers: I,
    reference: &'a [CarparkReference],
    live: &LotIndex,
) -> Vec<LiveCarpark<'a>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    numbers
        .into_iter()
        .filter_map(|number| {
            let number = number.as_ref();
            let carpark = reference.iter().find(|c| c.carpark_number == number)?;
            let lots = live.get(number)?;
            Some(LiveCarpark {
                carpark,
                total_lots: lots.total_lots,
                lots_available: lots.lots_available,
            })
        })
        .collect()
}
