use async_trait::async_trait;
use thiserror::Error;

use super::LiveAvailability;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    Shape(&'static str),
}

/// Common trait for live availability feeds
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Fetch the latest lot counts for every carpark the feed knows
    async fn fetch(&self) -> Result<LiveAvailability, FetchError>;

    /// Get the name of the feed
    fn source_name(&self) -> &'static str;
}
