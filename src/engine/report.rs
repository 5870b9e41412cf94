use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, instrument};

use crate::error::{CarparkError, Result};
use crate::models::{EnrichedSnapshot, ADDRESS, CARPARK_NUMBER, LOTS_AVAILABLE, TOTAL_LOTS};

const HEADER: [&str; 4] = [CARPARK_NUMBER, TOTAL_LOTS, LOTS_AVAILABLE, ADDRESS];

/// Field order matches `HEADER`
#[derive(Serialize)]
struct ReportRow<'a> {
    carpark_number: &'a str,
    total_lots: u32,
    lots_available: u32,
    address: &'a str,
}

/// Write the snapshot with addresses to `path`, sorted by lots available
/// (ascending, stable).
///
/// Layout: raw timestamp line, header line, one row per record. The report is
/// staged next to `path` and only linked into place once complete, so a failed
/// write leaves nothing behind. Refuses to touch an existing file. Returns the
/// number of lines written, including the timestamp and header.
#[instrument(skip(snapshot), fields(path = %path.display()))]
pub fn write_report(path: &Path, snapshot: &EnrichedSnapshot) -> Result<usize> {
    if path.exists() {
        return Err(CarparkError::FileExists(path.to_path_buf()));
    }
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| CarparkError::from_io(dir, e))?;

    let mut sorted: Vec<_> = snapshot.records.iter().collect();
    sorted.sort_by_key(|r| r.lots_available);

    let io_err = |e: std::io::Error| CarparkError::from_io(path, e);
    {
        let mut out = BufWriter::new(&mut staged);
        writeln!(out, "{}", snapshot.timestamp).map_err(io_err)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        writer
            .write_record(HEADER)
            .map_err(|e| io_err(e.into()))?;
        for record in &sorted {
            writer
                .serialize(ReportRow {
                    carpark_number: &record.carpark_number,
                    total_lots: record.total_lots,
                    lots_available: record.lots_available,
                    address: &record.address,
                })
                .map_err(|e| io_err(e.into()))?;
        }
        writer.flush().map_err(io_err)?;
    }

    staged
        .persist_noclobber(path)
        .map_err(|e| match e.error.kind() {
            std::io::ErrorKind::AlreadyExists => CarparkError::FileExists(path.to_path_buf()),
            _ => io_err(e.error),
        })?;

    let lines = sorted.len() + 2;
    info!(lines, "availability report written");
    Ok(lines)
}
