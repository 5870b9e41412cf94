mod config;
mod engine;
mod error;
mod favourites;
mod models;
mod records;
mod session;
mod sources;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Args, SessionConfig};
use favourites::FavouritesStore;
use session::{Console, Session};
use sources::DataGovClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout belongs to the menu
    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("🅿️  Carpark Scout v{}", env!("CARGO_PKG_VERSION"));

    let config = SessionConfig::from(&args);

    // Nothing works without the reference table
    let reference = records::load_reference(&config.reference_path).with_context(|| {
        format!(
            "Failed to read carpark reference table '{}'",
            config.reference_path.display()
        )
    })?;
    println!("'{}' was successfully read.", config.reference_path.display());

    let favourites = FavouritesStore::open(&config.favourites_path)
        .context("Failed to open favourites store")?;
    let source = DataGovClient::new(&config.api_url, config.timeout)
        .context("Failed to create HTTP client")?;

    let console = Console::new(std::io::stdin().lock(), std::io::stdout());
    Session::new(config, reference, favourites, Box::new(source), console)
        .run()
        .await
}
