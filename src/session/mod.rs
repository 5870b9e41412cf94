//! Interactive menu loop over the query engine.

pub mod console;
pub mod display;
pub mod menu;

pub use console::Console;
pub use menu::MenuOption;

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::engine::query;
use crate::engine::{with_live_lots, write_report, LiveCarpark, SnapshotState};
use crate::error::{CarparkError, ErrorKind};
use crate::favourites::FavouritesStore;
use crate::models::CarparkReference;
use crate::records;
use crate::sources::{AvailabilitySource, LiveAvailability};
use display::{
    availability_cells, basement_cells, live_cells, render_header, render_row,
    AVAILABILITY_COLUMNS, BASEMENT_COLUMNS, LIVE_COLUMNS,
};

/// Whether the loop keeps going after an option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// One user session: owns every piece of mutable state for its lifetime
pub struct Session<R, W> {
    config: SessionConfig,
    reference: Vec<CarparkReference>,
    full_reference: Vec<CarparkReference>,
    snapshot: SnapshotState,
    favourites: FavouritesStore,
    source: Box<dyn AvailabilitySource>,
    console: Console<R, W>,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(
        config: SessionConfig,
        reference: Vec<CarparkReference>,
        favourites: FavouritesStore,
        source: Box<dyn AvailabilitySource>,
        console: Console<R, W>,
    ) -> Self {
        Self {
            config,
            reference,
            full_reference: Vec::new(),
            snapshot: SnapshotState::default(),
            favourites,
            source,
            console,
        }
    }

    /// Run until the user exits or input ends, then close the favourites store
    pub async fn run(mut self) -> Result<()> {
        let menu = menu::render();
        loop {
            self.console.say(&menu)?;
            let Some(option) = self.prompt_option()? else {
                break;
            };
            self.console.say(format!(
                "Option {}: {}",
                option.number(),
                option.description()
            ))?;
            debug!(?option, "menu option selected");

            if self.dispatch(option).await? == Flow::Quit {
                break;
            }
            if self.console.prompt("Enter to continue: ")?.is_none() {
                break;
            }
        }
        self.console.say("See you again!")?;
        self.favourites.close()?;
        info!("session closed");
        Ok(())
    }

    async fn dispatch(&mut self, option: MenuOption) -> Result<Flow> {
        if option.needs_snapshot() && !self.snapshot.is_loaded() {
            self.console.say(format!(
                "Invalid option, select option {} or {} before selecting {}",
                MenuOption::LoadAvailability.number(),
                MenuOption::LoadLiveAvailability.number(),
                option.number()
            ))?;
            return Ok(Flow::Continue);
        }
        if option.needs_full_reference() && self.full_reference.is_empty() {
            self.console.say(format!(
                "Invalid option, select option {} before selecting {}",
                MenuOption::LoadFullReference.number(),
                option.number()
            ))?;
            return Ok(Flow::Continue);
        }

        match option {
            MenuOption::Exit => Ok(Flow::Quit),
            MenuOption::CountReference => self.count_reference(),
            MenuOption::BasementCarparks => self.basement_carparks(),
            MenuOption::LoadAvailability => self.load_availability(),
            MenuOption::CountAvailability => self.count_availability(),
            MenuOption::WithoutLots => self.without_lots(),
            MenuOption::AbovePercentage => self.above_percentage(false),
            MenuOption::AbovePercentageWithAddress => self.above_percentage(true),
            MenuOption::AtLocation => self.at_location(),
            MenuOption::MostLots => self.most_lots(),
            MenuOption::WriteReport => self.write_report(),
            MenuOption::LoadFullReference => self.load_full_reference(),
            MenuOption::ShowFavourites => self.show_favourites().await,
            MenuOption::AddFavourite => self.add_favourite(),
            MenuOption::RemoveFavourite => self.remove_favourite(),
            MenuOption::NearestToAddress => self.nearest_to_address().await,
            MenuOption::LoadLiveAvailability => self.load_live_availability().await,
        }
    }

    fn prompt_option(&mut self) -> Result<Option<MenuOption>> {
        let last = MenuOption::ALL.len() - 1;
        loop {
            let Some(line) = self.console.prompt("Enter your option: ")? else {
                return Ok(None);
            };
            if let Some(option) = line.trim().parse().ok().and_then(MenuOption::from_number) {
                return Ok(Some(option));
            }
            self.console.say(format!(
                "Invalid option, please enter a valid number between 0 and {last}"
            ))?;
        }
    }

    fn prompt_percentage(&mut self) -> Result<Option<f64>> {
        loop {
            let Some(line) = self.console.prompt("Enter the percentage required: ")? else {
                return Ok(None);
            };
            match line.trim().parse::<f64>() {
                Ok(pct) if (0.0..=100.0).contains(&pct) => return Ok(Some(pct)),
                _ => self
                    .console
                    .say("Invalid percentage, please enter a valid number between 0 and 100")?,
            }
        }
    }

    fn count_reference(&mut self) -> Result<Flow> {
        self.console.say(format!(
            "Total number of carparks in '{}': {}",
            self.config.reference_path.display(),
            query::count(&self.reference)
        ))?;
        Ok(Flow::Continue)
    }

    fn basement_carparks(&mut self) -> Result<Flow> {
        let basements = query::basement_carparks(&self.reference);
        self.console.say(render_header(&BASEMENT_COLUMNS))?;
        for carpark in &basements {
            self.console
                .say(render_row(&basement_cells(carpark), &BASEMENT_COLUMNS))?;
        }
        self.console
            .say(format!("Total number: {}", basements.len()))?;
        Ok(Flow::Continue)
    }

    fn load_availability(&mut self) -> Result<Flow> {
        loop {
            let Some(name) = self.console.prompt("Enter file name: ")? else {
                return Ok(Flow::Quit);
            };
            match records::load_availability(Path::new(name.trim())) {
                Ok(snapshot) => {
                    self.console
                        .say(format!("'{}' was successfully read.", name.trim()))?;
                    self.console.say(snapshot.display_timestamp())?;
                    self.snapshot.load(snapshot);
                    return Ok(Flow::Continue);
                }
                Err(err) => self.console.say(format!("Invalid file, {err}"))?,
            }
        }
    }

    fn count_availability(&mut self) -> Result<Flow> {
        let Some(snapshot) = self.snapshot.enriched(&self.reference) else {
            return Ok(Flow::Continue);
        };
        self.console.say(format!(
            "Total number of carparks in the snapshot taken {}: {}",
            snapshot.display_timestamp(),
            query::count(&snapshot.records)
        ))?;
        if !snapshot.defects.is_empty() {
            self.console.say(format!(
                "{} carparks were left out:",
                snapshot.defects.len()
            ))?;
            for defect in &snapshot.defects {
                self.console.say(format!("  {defect}"))?;
            }
        }
        Ok(Flow::Continue)
    }

    fn without_lots(&mut self) -> Result<Flow> {
        let Some(snapshot) = self.snapshot.enriched(&self.reference) else {
            return Ok(Flow::Continue);
        };
        let full = query::without_available_lots(&snapshot.records);
        for record in &full {
            self.console
                .say(format!("Carpark Number: {}", record.carpark_number))?;
        }
        self.console.say(format!("Total number: {}", full.len()))?;
        Ok(Flow::Continue)
    }

    fn above_percentage(&mut self, with_address: bool) -> Result<Flow> {
        let Some(threshold) = self.prompt_percentage()? else {
            return Ok(Flow::Quit);
        };
        let Some(snapshot) = self.snapshot.enriched(&self.reference) else {
            return Ok(Flow::Continue);
        };
        let columns = if with_address {
            &AVAILABILITY_COLUMNS[..]
        } else {
            &AVAILABILITY_COLUMNS[..4]
        };

        match query::above_percentage(&snapshot.records, threshold) {
            Ok(found) => {
                self.console.say(render_header(columns))?;
                for record in &found {
                    self.console
                        .say(render_row(&availability_cells(record), columns))?;
                }
                self.console.say(format!("Total number: {}", found.len()))?;
            }
            Err(err) => self.console.say(err.to_string())?,
        }
        Ok(Flow::Continue)
    }

    fn at_location(&mut self) -> Result<Flow> {
        let Some(location) = self.console.prompt("Enter the location: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(snapshot) = self.snapshot.enriched(&self.reference) else {
            return Ok(Flow::Continue);
        };

        match query::at_location(&snapshot.records, &location) {
            Ok(found) => {
                self.console.say(render_header(&AVAILABILITY_COLUMNS))?;
                for record in &found {
                    self.console
                        .say(render_row(&availability_cells(record), &AVAILABILITY_COLUMNS))?;
                }
                self.console.say(format!("Total number: {}", found.len()))?;
            }
            Err(CarparkError::NoMatch(_)) => {
                self.console.say(format!("No carparks found in {location}"))?
            }
            Err(err) => self.console.say(err.to_string())?,
        }
        Ok(Flow::Continue)
    }

    fn most_lots(&mut self) -> Result<Flow> {
        let Some(snapshot) = self.snapshot.enriched(&self.reference) else {
            return Ok(Flow::Continue);
        };
        match query::most_lots(&snapshot.records) {
            Ok(record) => {
                for (column, value) in AVAILABILITY_COLUMNS.iter().zip(availability_cells(record)) {
                    self.console.say(format!("{}: {value}", column.header))?;
                }
            }
            Err(err) => self.console.say(err.to_string())?,
        }
        Ok(Flow::Continue)
    }

    fn write_report(&mut self) -> Result<Flow> {
        let Some(snapshot) = self.snapshot.enriched(&self.reference) else {
            return Ok(Flow::Continue);
        };
        let path = &self.config.report_path;
        match write_report(path, snapshot) {
            Ok(lines) => self.console.say(format!(
                "{lines} lines were written to '{}'",
                path.display()
            ))?,
            Err(err @ CarparkError::FileExists(_)) => {
                self.console.say(format!("Invalid option, {err}"))?
            }
            Err(err) => {
                warn!("report not written: {err}");
                self.console.say(format!("Could not write report: {err}"))?
            }
        }
        Ok(Flow::Continue)
    }

    fn load_full_reference(&mut self) -> Result<Flow> {
        let path = &self.config.full_reference_path;
        match records::load_reference(path) {
            Ok(carparks) => {
                self.console
                    .say(format!("'{}' was successfully read.", path.display()))?;
                self.full_reference = carparks;
            }
            Err(err) => self.console.say(format!("Invalid file, {err}"))?,
        }
        Ok(Flow::Continue)
    }

    async fn fetch_live(&mut self) -> Result<Option<LiveAvailability>> {
        match self.source.fetch().await {
            Ok(live) => {
                debug!(fetched_at = %live.fetched_at, "live availability fetched");
                self.console.say(format!(
                    "Success, carpark availability received from {}.",
                    self.source.source_name()
                ))?;
                Ok(Some(live))
            }
            Err(err) => {
                let err = CarparkError::from(err);
                warn!(kind = ?err.kind(), "live availability unavailable: {err}");
                self.console.say(format!("Could not fetch live availability: {err}"))?;
                Ok(None)
            }
        }
    }

    async fn show_favourites(&mut self) -> Result<Flow> {
        if self.favourites.is_empty() {
            self.console.say(format!(
                "You have not saved any carparks to your favourites.\n\
                 Add carparks to your favourites in option {}",
                MenuOption::AddFavourite.number()
            ))?;
            return Ok(Flow::Continue);
        }
        let Some(live) = self.fetch_live().await? else {
            return Ok(Flow::Continue);
        };

        let rows = with_live_lots(self.favourites.list(), &self.full_reference, live.lots());
        live_table(&mut self.console, &rows)?;
        Ok(Flow::Continue)
    }

    fn add_favourite(&mut self) -> Result<Flow> {
        loop {
            let Some(number) = self.console.prompt("Enter Carpark Number: ")? else {
                return Ok(Flow::Quit);
            };
            let number = number.trim();
            match self.favourites.add(number, &self.full_reference) {
                Ok(()) => {
                    self.console
                        .say(format!("Carpark: {number} has been saved to favourites"))?;
                    return Ok(Flow::Continue);
                }
                Err(err)
                    if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::AlreadyExists) =>
                {
                    self.console.say(format!("Invalid carpark, {err}"))?
                }
                Err(err) => {
                    self.console.say(format!("Could not save favourites: {err}"))?;
                    return Ok(Flow::Continue);
                }
            }
        }
    }

    fn remove_favourite(&mut self) -> Result<Flow> {
        if self.favourites.is_empty() {
            self.console.say(format!(
                "You have not added any carparks to your favourites.\n\
                 Add carparks to your favourites in option {}",
                MenuOption::AddFavourite.number()
            ))?;
            return Ok(Flow::Continue);
        }
        loop {
            let Some(number) = self.console.prompt("Enter Carpark Number: ")? else {
                return Ok(Flow::Quit);
            };
            let number = number.trim();
            match self.favourites.remove(number) {
                Ok(()) => {
                    self.console
                        .say(format!("Carpark: {number} has been removed from favourites"))?;
                    return Ok(Flow::Continue);
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    self.console.say(format!("Invalid carpark, {err}"))?
                }
                Err(err) => {
                    self.console.say(format!("Could not save favourites: {err}"))?;
                    return Ok(Flow::Continue);
                }
            }
        }
    }

    async fn nearest_to_address(&mut self) -> Result<Flow> {
        let ranked: Vec<String> = loop {
            let Some(address) = self.console.prompt("Enter the address: ")? else {
                return Ok(Flow::Quit);
            };
            match query::nearest_to_address(&self.full_reference, &address) {
                Ok(nearest) => {
                    debug!(
                        x = nearest.centre.x,
                        y = nearest.centre.y,
                        count = nearest.ranked.len(),
                        "ranked carparks around centre"
                    );
                    break nearest
                        .ranked
                        .iter()
                        .map(|r| r.carpark.carpark_number.clone())
                        .collect();
                }
                Err(CarparkError::NoMatch(_)) => self
                    .console
                    .say("Invalid address, no carparks are at this location.")?,
                Err(err) => {
                    self.console.say(err.to_string())?;
                    return Ok(Flow::Continue);
                }
            }
        };

        let Some(live) = self.fetch_live().await? else {
            return Ok(Flow::Continue);
        };
        let rows = with_live_lots(&ranked, &self.full_reference, live.lots());
        live_table(&mut self.console, &rows)?;
        Ok(Flow::Continue)
    }

    async fn load_live_availability(&mut self) -> Result<Flow> {
        let Some(live) = self.fetch_live().await? else {
            return Ok(Flow::Continue);
        };
        if live.is_empty() {
            self.console.say("The live feed returned no carparks.")?;
            return Ok(Flow::Continue);
        }
        let snapshot = live.into_snapshot();
        self.console.say(format!(
            "Live snapshot of {} carparks loaded.",
            snapshot.records.len()
        ))?;
        self.console.say(snapshot.display_timestamp())?;
        self.snapshot.load(snapshot);
        Ok(Flow::Continue)
    }
}

fn live_table<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    rows: &[LiveCarpark<'_>],
) -> Result<()> {
    console.say(render_header(&LIVE_COLUMNS))?;
    for row in rows {
        console.say(render_row(&live_cells(row), &LIVE_COLUMNS))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AvailabilityRecord;
    use crate::sources::FetchError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    const REFERENCE: &str = "\
Carpark Number,Carpark Type,Address
A1,BASEMENT CAR PARK,\"BLK 1, ORCHARD ROAD\"
B2,SURFACE CAR PARK,BLK 2 TAMPINES ST 11
";

    const FULL_REFERENCE: &str = "\
Carpark Number,Carpark Type,Type of Parking System,Address,X,Y
A1,BASEMENT CAR PARK,ELECTRONIC PARKING,1 PUNGGOL WAY,0,0
B2,SURFACE CAR PARK,COUPON PARKING,10 PUNGGOL WAY,10,0
C3,SURFACE CAR PARK,COUPON PARKING,11 PUNGGOL WAY,0,10
D4,MULTI-STOREY CAR PARK,ELECTRONIC PARKING,BEDOK NORTH,50,50
";

    const AVAILABILITY: &str = "\
2024-03-01 09:15:00
Carpark Number,Total Lots,Lots Available
A1,100,25
B2,40,0
Z9,10,5
";

    struct StubSource(Option<Vec<AvailabilityRecord>>);

    #[async_trait]
    impl AvailabilitySource for StubSource {
        async fn fetch(&self) -> Result<LiveAvailability, FetchError> {
            let records = self.0.clone().ok_or(FetchError::Shape("offline"))?;
            Ok(LiveAvailability::new(
                "2024-03-01 10:00:00".into(),
                Utc::now(),
                records,
            ))
        }

        fn source_name(&self) -> &'static str {
            "stub"
        }
    }

    fn live(rows: &[(&str, u32, u32)]) -> StubSource {
        StubSource(Some(
            rows.iter()
                .map(|&(number, total, available)| AvailabilityRecord {
                    carpark_number: number.into(),
                    total_lots: total,
                    lots_available: available,
                })
                .collect(),
        ))
    }

    struct Fixture {
        dir: TempDir,
        config: SessionConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("reference.csv"), REFERENCE).unwrap();
            fs::write(dir.path().join("full.csv"), FULL_REFERENCE).unwrap();
            fs::write(dir.path().join("availability.csv"), AVAILABILITY).unwrap();
            let config = SessionConfig {
                reference_path: dir.path().join("reference.csv"),
                full_reference_path: dir.path().join("full.csv"),
                report_path: dir.path().join("report.csv"),
                favourites_path: dir.path().join("user").join("favourites.json"),
                ..SessionConfig::default()
            };
            Self { dir, config }
        }

        fn availability_path(&self) -> String {
            self.dir.path().join("availability.csv").display().to_string()
        }

        async fn run(&self, input: &str, source: StubSource) -> String {
            let reference = records::load_reference(&self.config.reference_path).unwrap();
            let favourites = FavouritesStore::open(&self.config.favourites_path).unwrap();
            let mut out = Vec::new();
            let console = Console::new(input.as_bytes(), &mut out);
            Session::new(
                self.config.clone(),
                reference,
                favourites,
                Box::new(source),
                console,
            )
            .run()
            .await
            .unwrap();
            String::from_utf8(out).unwrap()
        }
    }

    #[tokio::test]
    async fn snapshot_options_are_gated_until_loaded() {
        let fx = Fixture::new();
        let out = fx.run("4\n\n0\n", StubSource(None)).await;
        assert!(out.contains("Invalid option, select option 3 or 16 before selecting 4"));
        assert!(out.ends_with("See you again!\n"));
    }

    #[tokio::test]
    async fn invalid_option_is_reprompted() {
        let fx = Fixture::new();
        let out = fx.run("42\nabc\n1\n\n0\n", StubSource(None)).await;
        assert_eq!(
            out.matches("Invalid option, please enter a valid number between 0 and 16")
                .count(),
            2
        );
        assert!(out.contains("Total number of carparks in"));
        assert!(out.contains("': 2"));
    }

    #[tokio::test]
    async fn threshold_query_after_loading_file() {
        let fx = Fixture::new();
        let input = format!(
            "3\nmissing.csv\n{}\n\n7\n150\n20\n\n0\n",
            fx.availability_path()
        );
        let out = fx.run(&input, StubSource(None)).await;
        assert!(out.contains("Invalid file, 'missing.csv' is not found"));
        assert!(out.contains("2024-03-01 09:15:00"));
        assert!(out.contains("Invalid percentage"));
        assert!(out.contains("BLK 1, ORCHARD ROAD"));
        assert!(out.contains(" Z9 "));
        assert!(out.contains("Total number: 2"));
    }

    #[tokio::test]
    async fn short_rows_are_listed_not_fatal() {
        let fx = Fixture::new();
        let path = fx.dir.path().join("partial.csv");
        fs::write(
            &path,
            "2024-03-01 09:15:00\nCarpark Number,Total Lots,Lots Available\nA1,100,25\nB2,40\n",
        )
        .unwrap();
        let input = format!("3\n{}\n\n4\n\n0\n", path.display());
        let out = fx.run(&input, StubSource(None)).await;
        assert!(!out.contains("Invalid file"));
        assert!(out.contains("taken 2024-03-01 09:15:00: 1"));
        assert!(out.contains("1 carparks were left out:"));
        assert!(out.contains("line 4"));
    }

    #[tokio::test]
    async fn location_without_match_is_reported() {
        let fx = Fixture::new();
        let input = format!("3\n{}\n\n8\njurong\n\n8\norchard\n\n0\n", fx.availability_path());
        let out = fx.run(&input, StubSource(None)).await;
        assert!(out.contains("No carparks found in jurong"));
        assert!(out.contains("Total number: 1"));
    }

    #[tokio::test]
    async fn report_is_written_once() {
        let fx = Fixture::new();
        let input = format!("3\n{}\n\n10\n\n10\n\n0\n", fx.availability_path());
        let out = fx.run(&input, StubSource(None)).await;
        assert!(out.contains("5 lines were written to"));
        assert!(out.contains("already exists"));

        let report = fs::read_to_string(&fx.config.report_path).unwrap();
        let rows: Vec<&str> = report.lines().collect();
        assert_eq!(rows[0], "2024-03-01 09:15:00");
        assert!(rows[2].starts_with("B2,40,0,"));
    }

    #[tokio::test]
    async fn favourites_need_full_reference_and_persist() {
        let fx = Fixture::new();
        let input = "13\n\n11\n\n12\n\n13\nZZ\nA1\n\n13\nA1\nB2\n\n12\n\n14\nC3\nB2\n\n0\n";
        let out = fx
            .run(input, live(&[("A1", 100, 42), ("B2", 40, 3)]))
            .await;

        assert!(out.contains("Invalid option, select option 11 before selecting 13"));
        assert!(out.contains("You have not saved any carparks"));
        assert!(out.contains("Invalid carpark, carpark ZZ does not exist"));
        assert!(out.contains("Invalid carpark, carpark A1 is already in favourites"));
        assert!(out.contains("Invalid carpark, carpark C3 is not in favourites"));
        assert!(out.contains("Carpark: B2 has been removed from favourites"));
        assert!(out.contains("ELECTRONIC PARKING"));

        let reopened = FavouritesStore::open(&fx.config.favourites_path).unwrap();
        assert_eq!(reopened.list(), ["A1"]);
    }

    #[tokio::test]
    async fn nearest_lists_carparks_by_distance() {
        let fx = Fixture::new();
        let input = "11\n\n15\nyishun\npunggol\n\n0\n";
        let out = fx
            .run(input, live(&[("A1", 100, 1), ("B2", 40, 2), ("C3", 30, 3)]))
            .await;
        assert!(out.contains("Invalid address, no carparks are at this location."));

        let a1 = out.find(" A1 ").unwrap();
        let b2 = out.find(" B2 ").unwrap();
        let c3 = out.find(" C3 ").unwrap();
        assert!(a1 < b2 && b2 < c3);
        assert!(!out.contains(" D4 "));
    }

    #[tokio::test]
    async fn remote_failure_is_reported_not_fatal() {
        let fx = Fixture::new();
        let out = fx.run("16\n\n4\n\n0\n", StubSource(None)).await;
        assert!(out.contains("Could not fetch live availability"));
        assert!(out.contains("select option 3 or 16 before selecting 4"));
    }

    #[tokio::test]
    async fn live_snapshot_feeds_queries() {
        let fx = Fixture::new();
        let out = fx
            .run("16\n\n4\n\n9\n\n0\n", live(&[("A1", 100, 25), ("B2", 400, 0)]))
            .await;
        assert!(out.contains("Live snapshot of 2 carparks loaded."));
        assert!(out.contains("snapshot taken 2024-03-01 10:00:00: 2"));
        assert!(out.contains("Carpark Number: B2"));
        assert!(out.contains("Total Lots: 400"));
    }

    #[tokio::test]
    async fn end_of_input_closes_cleanly() {
        let fx = Fixture::new();
        let out = fx.run("3\n", StubSource(None)).await;
        assert!(out.ends_with("See you again!\n"));
    }
}
