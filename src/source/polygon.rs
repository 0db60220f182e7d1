//! Polygon.io data source adapter.
//!
//! Thin HTTP wrapper over the Polygon REST API covering the three data
//! types this crate downloads:
//!
//! - aggregates: `/v2/aggs/ticker/{symbol}/range/{mult}/{unit}/{from}/{to}`
//! - quotes: `/v3/quotes/{symbol}`
//! - trades: `/v3/trades/{symbol}`
//!
//! Responses are paginated via `next_url`; all pages of one artifact are
//! collected into a single [`Table`]. The adapter classifies failures into
//! the [`FetchError`] taxonomy and never retries — retry policy lives in
//! the coordinator.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::source::{FetchError, FetchResult, MarketDataSource};
use crate::{Artifact, DataType, Table};

const DEFAULT_BASE_URL: &str = "https://api.polygon.io";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size for v3 tick endpoints (provider maximum).
const TICK_PAGE_LIMIT: u32 = 50_000;

/// Envelope shared by all Polygon list endpoints.
#[derive(Debug, Deserialize)]
struct PolygonResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(default)]
    next_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Polygon.io implementation of [`MarketDataSource`].
pub struct PolygonSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PolygonSource {
    /// Create a source with the given API key and a default 30s timeout.
    pub fn new(api_key: impl Into<String>) -> FetchResult<Self> {
        Self::with_timeout(api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a source with an explicit per-request timeout.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Permanent(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Create a source from the `POLYGON_API_KEY` environment variable.
    pub fn from_env() -> FetchResult<Self> {
        let api_key = std::env::var("POLYGON_API_KEY")
            .map_err(|_| FetchError::Permanent("POLYGON_API_KEY is not set".to_string()))?;
        Self::new(api_key)
    }

    /// Override the base URL (used by tests against a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the first-page URL for an artifact.
    fn request_url(&self, artifact: &Artifact) -> FetchResult<String> {
        let symbol = &artifact.symbol;
        let range = &artifact.date_range;

        match artifact.data_type {
            DataType::Aggregates => {
                let freq = artifact.frequency.ok_or_else(|| {
                    FetchError::Permanent(format!(
                        "aggregates request for {symbol} has no frequency"
                    ))
                })?;
                let from = range.start.and_utc().timestamp_millis();
                let to = range.end.and_utc().timestamp_millis();
                Ok(format!(
                    "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}?adjusted=true&sort=asc&limit=50000",
                    self.base_url, symbol, freq.multiplier, freq.unit, from, to
                ))
            }
            DataType::Quotes | DataType::Trades => {
                let endpoint = match artifact.data_type {
                    DataType::Quotes => "quotes",
                    _ => "trades",
                };
                // v3 tick endpoints filter on nanosecond timestamps.
                let gte = range.start.and_utc().timestamp_nanos_opt().ok_or_else(|| {
                    FetchError::Permanent(format!("range start out of bounds: {}", range.start))
                })?;
                let lte = range.end.and_utc().timestamp_nanos_opt().ok_or_else(|| {
                    FetchError::Permanent(format!("range end out of bounds: {}", range.end))
                })?;
                Ok(format!(
                    "{}/v3/{}/{}?timestamp.gte={}&timestamp.lte={}&order=asc&limit={}",
                    self.base_url, endpoint, symbol, gte, lte, TICK_PAGE_LIMIT
                ))
            }
        }
    }

    /// Execute one GET and parse the Polygon envelope.
    async fn get_page(&self, url: &str) -> FetchResult<PolygonResponse> {
        let response = self
            .client
            .get(url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let page: PolygonResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Permanent(format!("malformed response body: {e}")))?;

        if let Some(error) = &page.error {
            return Err(FetchError::Permanent(format!("API error: {error}")));
        }

        Ok(page)
    }
}

#[async_trait]
impl MarketDataSource for PolygonSource {
    async fn fetch(&self, artifact: &Artifact) -> FetchResult<Table> {
        let mut url = self.request_url(artifact)?;
        let mut records: Vec<serde_json::Value> = Vec::new();
        let mut pages = 0u32;

        loop {
            debug!(artifact = %artifact.key(), page = pages, "fetching page");
            let page = self.get_page(&url).await?;
            pages += 1;
            records.extend(page.results);

            match page.next_url {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!(
            artifact = %artifact.key(),
            pages = pages,
            rows = records.len(),
            "fetch complete"
        );
        Ok(Table::from_records(&records))
    }
}

/// Map a reqwest transport error onto the retry taxonomy.
fn classify_request_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(error.to_string())
    } else if error.is_builder() || error.is_request() {
        FetchError::Permanent(error.to_string())
    } else {
        FetchError::Transient(error.to_string())
    }
}

/// Map an HTTP status onto the retry taxonomy.
///
/// 429 and 5xx are transient, 408 is a timeout, every other 4xx is
/// permanent (the request itself is wrong and will not improve).
fn classify_status(status: StatusCode, body: &str) -> FetchError {
    let detail = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        FetchError::Transient(detail)
    } else if status == StatusCode::REQUEST_TIMEOUT {
        FetchError::Timeout(detail)
    } else {
        FetchError::Permanent(detail)
    }
}
