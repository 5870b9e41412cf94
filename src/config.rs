use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::sources::data_gov::DEFAULT_API_URL;

/// Carpark availability explorer
#[derive(Parser, Debug)]
#[command(name = "carpark-scout", version, about)]
pub struct Args {
    /// Carpark reference table, read at startup
    #[arg(long, env = "CARPARK_REFERENCE", default_value = "carpark-information.csv")]
    pub reference: PathBuf,

    /// Reference table with parking system type and X/Y coordinates
    #[arg(
        long,
        env = "CARPARK_FULL_REFERENCE",
        default_value = "carpark-information-full.csv"
    )]
    pub full_reference: PathBuf,

    /// Where the availability-with-address report is written
    #[arg(
        long,
        env = "CARPARK_REPORT",
        default_value = "carpark-availability-with-address.csv"
    )]
    pub report: PathBuf,

    /// Favourites store
    #[arg(long, env = "CARPARK_FAVOURITES", default_value = "user/favourites.json")]
    pub favourites: PathBuf,

    /// Live availability endpoint
    #[arg(long, env = "CARPARK_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// HTTP timeout for the live feed, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log filter, e.g. `debug` or `carpark_scout=trace` (overrides RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Resolved settings for one interactive session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub reference_path: PathBuf,
    pub full_reference_path: PathBuf,
    pub report_path: PathBuf,
    pub favourites_path: PathBuf,
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reference_path: "carpark-information.csv".into(),
            full_reference_path: "carpark-information-full.csv".into(),
            report_path: "carpark-availability-with-address.csv".into(),
            favourites_path: "user/favourites.json".into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Args> for SessionConfig {
    fn from(args: &Args) -> Self {
        Self {
            reference_path: args.reference.clone(),
            full_reference_path: args.full_reference.clone(),
            report_path: args.report.clone(),
            favourites_path: args.favourites.clone(),
            api_url: args.api_url.clone(),
            timeout: Duration::from_secs(args.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_parsed_defaults() {
        let args = Args::parse_from(["carpark-scout"]);
        let from_args = SessionConfig::from(&args);
        let default = SessionConfig::default();
        assert_eq!(from_args.reference_path, default.reference_path);
        assert_eq!(from_args.report_path, default.report_path);
        assert_eq!(from_args.api_url, default.api_url);
        assert_eq!(from_args.timeout, default.timeout);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "carpark-scout",
            "--reference",
            "ref.csv",
            "--timeout-secs",
            "5",
            "--log-level",
            "debug",
        ]);
        let config = SessionConfig::from(&args);
        assert_eq!(config.reference_path, PathBuf::from("ref.csv"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
