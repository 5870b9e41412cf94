//! Fixed-width table rendering for the interactive menu.

use crate::engine::LiveCarpark;
use crate::models::{
    CarparkReference, EnrichedRecord, ADDRESS, CARPARK_NUMBER, CARPARK_TYPE, LOTS_AVAILABLE,
    PARKING_SYSTEM_TYPE, PERCENTAGE, TOTAL_LOTS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub width: usize,
    pub align: Align,
}

const fn col(header: &'static str, width: usize, align: Align) -> Column {
    Column {
        header,
        width,
        align,
    }
}

pub const BASEMENT_COLUMNS: [Column; 3] = [
    col(CARPARK_NUMBER, 14, Align::Left),
    col(CARPARK_TYPE, 17, Align::Left),
    col(ADDRESS, 7, Align::Left),
];

pub const AVAILABILITY_COLUMNS: [Column; 5] = [
    col(CARPARK_NUMBER, 14, Align::Left),
    col(TOTAL_LOTS, 10, Align::Right),
    col(LOTS_AVAILABLE, 14, Align::Right),
    col(PERCENTAGE, 10, Align::Right),
    col(ADDRESS, 7, Align::Left),
];

pub const LIVE_COLUMNS: [Column; 6] = [
    col(CARPARK_NUMBER, 14, Align::Left),
    col(CARPARK_TYPE, 29, Align::Left),
    col(PARKING_SYSTEM_TYPE, 25, Align::Left),
    col(TOTAL_LOTS, 10, Align::Left),
    col(LOTS_AVAILABLE, 14, Align::Left),
    col(ADDRESS, 7, Align::Left),
];

/// Pad each cell to its column; longer cells are never cut.
pub fn render_row<S: AsRef<str>>(cells: &[S], columns: &[Column]) -> String {
    cells
        .iter()
        .zip(columns)
        .map(|(cell, column)| {
            let cell = cell.as_ref();
            match column.align {
                Align::Left => format!(" {:<width$} ", cell, width = column.width),
                Align::Right => format!(" {:>width$} ", cell, width = column.width),
            }
        })
        .collect()
}

pub fn render_header(columns: &[Column]) -> String {
    let headers: Vec<&str> = columns.iter().map(|c| c.header).collect();
    render_row(&headers, columns)
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

pub fn basement_cells(carpark: &CarparkReference) -> Vec<String> {
    vec![
        carpark.carpark_number.clone(),
        text(&carpark.carpark_type).to_owned(),
        text(&carpark.address).to_owned(),
    ]
}

pub fn availability_cells(record: &EnrichedRecord) -> Vec<String> {
    vec![
        record.carpark_number.clone(),
        record.total_lots.to_string(),
        record.lots_available.to_string(),
        record.percentage.to_string(),
        record.address.clone(),
    ]
}

pub fn live_cells(live: &LiveCarpark<'_>) -> Vec<String> {
    let carpark = live.carpark;
    vec![
        carpark.carpark_number.clone(),
        text(&carpark.carpark_type).to_owned(),
        text(&carpark.parking_system_type).to_owned(),
        live.total_lots.to_string(),
        live.lots_available.to_string(),
        text(&carpark.address).to_owned(),
    ]
}
