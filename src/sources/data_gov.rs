use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use super::traits::{AvailabilitySource, FetchError};
use crate::engine::LotIndex;
use crate::models::{AvailabilityRecord, AvailabilitySnapshot};

pub const DEFAULT_API_URL: &str = "https://api.data.gov.sg/v1/transport/carpark-availability";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Deserialize)]
struct ApiItem {
    timestamp: Option<String>,
    #[serde(default)]
    carpark_data: Vec<ApiCarpark>,
}

#[derive(Deserialize)]
struct ApiCarpark {
    carpark_number: String,
    #[serde(default)]
    carpark_info: Vec<ApiLotInfo>,
}

#[derive(Deserialize)]
struct ApiLotInfo {
    #[serde(deserialize_with = "lenient_count")]
    total_lots: u32,
    #[serde(deserialize_with = "lenient_count")]
    lots_available: u32,
}

/// The feed sends counts as strings; accept plain numbers too.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u32),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Flattened live lot counts
#[derive(Debug, Clone)]
pub struct LiveAvailability {
    /// Feed timestamp, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub fetched_at: DateTime<Utc>,
    /// Carparks in feed order
    pub records: Vec<AvailabilityRecord>,
    lots: LotIndex,
}

impl LiveAvailability {
    pub fn new(
        timestamp: String,
        fetched_at: DateTime<Utc>,
        records: Vec<AvailabilityRecord>,
    ) -> Self {
        // A carpark listed twice keeps its last counts.
        let lots = records
            .iter()
            .map(|r| (r.carpark_number.clone(), r.clone()))
            .collect();
        Self {
            timestamp,
            fetched_at,
            records,
            lots,
        }
    }

    pub fn lots(&self) -> &LotIndex {
        &self.lots
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Normalize into the same shape as a file-sourced snapshot
    pub fn into_snapshot(self) -> AvailabilitySnapshot {
        AvailabilitySnapshot {
            timestamp: self.timestamp,
            records: self.records,
            defects: Vec::new(),
        }
    }
}

/// Flatten `items[0].carpark_data[*].carpark_info[0]` into lot counts.
///
/// Carparks without any `carpark_info` entry are skipped.
pub fn parse_response(
    body: &str,
    fetched_at: DateTime<Utc>,
) -> Result<LiveAvailability, FetchError> {
    let response: ApiResponse = serde_json::from_str(body)?;
    let item = response
        .items
        .into_iter()
        .next()
        .ok_or(FetchError::Shape("response has no items"))?;

    let timestamp = item
        .timestamp
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| {
            fetched_at
                .with_timezone(&Local)
                .format(TIMESTAMP_FORMAT)
                .to_string()
        });

    let mut skipped = 0usize;
    let records: Vec<AvailabilityRecord> = item
        .carpark_data
        .into_iter()
        .filter_map(|carpark| match carpark.carpark_info.into_iter().next() {
            Some(info) => Some(AvailabilityRecord {
                carpark_number: carpark.carpark_number,
                total_lots: info.total_lots,
                lots_available: info.lots_available,
            }),
            None => {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        debug!(skipped, "carparks without lot info");
    }

    Ok(LiveAvailability::new(timestamp, fetched_at, records))
}

/// HTTP client for the data.gov.sg carpark availability feed
pub struct DataGovClient {
    client: Client,
    url: String,
}

impl DataGovClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("carpark-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }
}

#[async_trait]
impl AvailabilitySource for DataGovClient {
    async fn fetch(&self) -> Result<LiveAvailability, FetchError> {
        debug!(url = %self.url, "fetching live availability");

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "availability feed returned an error");
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let live = parse_response(&body, Utc::now())?;
        info!(
            count = live.records.len(),
            timestamp = %live.timestamp,
            "received live availability"
        );
        Ok(live)
    }

    fn source_name(&self) -> &'static str {
        "data.gov.sg"
    }
}
