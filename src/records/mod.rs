//! Delimited text parsing into header-keyed records.

pub mod loader;

pub use loader::{load_availability, load_reference};

use crate::error::Result;

/// One data row, keyed by the header row's field names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the source text
    pub line: usize,
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Header row plus the data rows mapped onto it
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

/// Parse a header line followed by data rows.
///
/// Quoted fields may contain the delimiter; quotes are stripped and every
/// value is trimmed. Rows map onto headers by position: short rows yield
/// records with the trailing keys absent and surplus values are ignored.
/// Rows with no content are skipped. `first_line` is the 1-based line number
/// of the header in the source.
pub fn parse_records(text: &str, first_line: usize) -> Result<RecordSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        let line = row.position().map_or(1, |p| p.line() as usize) + first_line - 1;
        records.push(Record {
            line,
            fields: headers
                .iter()
                .cloned()
                .zip(row.iter().map(str::to_owned))
                .collect(),
        });
    }

    Ok(RecordSet { headers, records })
}
