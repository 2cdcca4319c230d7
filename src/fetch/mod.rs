//! Upstream usage statistics source.
//!
//! Raw documents are fetched over HTTP as JSON. Period and format listings
//! come from the configured catalog: every month from the minimum supported
//! period up to the last completed month (or the configured maximum period,
//! if earlier), each offering the configured formats that belong to the
//! supported ruleset family.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::models::RawStatsDocument;

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No usage data at {0}")]
    NotFound(String),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Content too large: {size} bytes (max {max_size})")]
    ContentTooLarge { size: usize, max_size: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of raw usage documents and their listings.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &'static str;

    /// Available periods, ascending.
    async fn fetch_periods(&self) -> Result<Vec<String>, FetchError>;

    /// Formats available for a period.
    async fn fetch_formats(&self, period: &str) -> Result<Vec<String>, FetchError>;

    /// The raw usage document for one period and format.
    async fn fetch_raw_document(
        &self,
        period: &str,
        format: &str,
    ) -> Result<RawStatsDocument, FetchError>;
}

/// Configuration for the HTTP source.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Root of the stats tree, with a trailing slash
    pub base_url: Url,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Maximum document size (default 64MB)
    pub max_content_size: usize,

    /// Earliest period offered
    pub min_period: String,

    /// Last period offered; `None` runs through the last completed month
    pub max_period: Option<String>,

    /// Format catalog offered for every period in `min_period..=max_period`
    pub formats: Vec<String>,
}

pub const DEFAULT_BASE_URL: &str = "https://www.smogon.com/stats/";
pub const DEFAULT_MIN_PERIOD: &str = "2023-10";

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            timeout: Duration::from_secs(30),
            user_agent: format!("usage-meta/{}", env!("CARGO_PKG_VERSION")),
            max_content_size: 64 * 1024 * 1024,
            min_period: DEFAULT_MIN_PERIOD.to_string(),
            max_period: None,
            formats: default_formats(),
        }
    }
}

/// The Regulation G best-of-three ladders. One ruleset covers the whole
/// offered window, so a deployment tracking a later regulation sets
/// `max_period` where Regulation G ends and lists the new formats instead.
pub fn default_formats() -> Vec<String> {
    [
        "gen9vgc2024regg-bo3-0.json",
        "gen9vgc2024regg-bo3-1500.json",
        "gen9vgc2024regg-bo3-1630.json",
        "gen9vgc2024regg-bo3-1760.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn period_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{4})-(0[1-9]|1[0-2])$").unwrap())
}

/// `YYYY-MM` with a real month.
pub fn is_valid_period(period: &str) -> bool {
    period_pattern().is_match(period)
}

fn parse_period(period: &str) -> Option<(i32, u32)> {
    let caps = period_pattern().captures(period)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Every period from `min_period` through the month before `today`.
pub fn periods_until(min_period: &str, today: NaiveDate) -> Vec<String> {
    let Some((mut year, mut month)) = parse_period(min_period) else {
        return Vec::new();
    };

    let (last_year, last_month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };

    let mut periods = Vec::new();
    while (year, month) <= (last_year, last_month) {
        periods.push(format!("{:04}-{:02}", year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    periods
}

/// Formats from the supported ruleset family: best-of-three VGC documents.
pub fn is_supported_format(format: &str) -> bool {
    format.contains("vgc") && format.contains("bo3") && format.ends_with(".json")
}

/// HTTP source backed by the public stats tree.
pub struct SmogonSource {
    client: Client,
    config: FetcherConfig,
}

impl SmogonSource {
    /// Create a new source with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("usage-meta")),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a source with default configuration.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(FetcherConfig::default())
    }

    /// `{base_url}{period}/chaos/{format}`
    pub fn document_url(&self, period: &str, format: &str) -> Result<Url, FetchError> {
        if !is_valid_period(period) {
            return Err(FetchError::InvalidUrl(format!("bad period {:?}", period)));
        }
        if format.is_empty() || format.contains('/') || format.contains("..") {
            return Err(FetchError::InvalidUrl(format!("bad format {:?}", format)));
        }

        self.config
            .base_url
            .join(&format!("{}/chaos/{}", period, format))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }

    fn offers_period(&self, period: &str) -> bool {
        is_valid_period(period)
            && period >= self.config.min_period.as_str()
            && self
                .config
                .max_period
                .as_deref()
                .map_or(true, |max| period <= max)
    }
}

#[async_trait]
impl StatsSource for SmogonSource {
    fn name(&self) -> &'static str {
        "smogon"
    }

    async fn fetch_periods(&self) -> Result<Vec<String>, FetchError> {
        let mut periods = periods_until(&self.config.min_period, Utc::now().date_naive());
        if let Some(max) = self.config.max_period.as_deref() {
            periods.retain(|p| p.as_str() <= max);
        }
        Ok(periods)
    }

    async fn fetch_formats(&self, period: &str) -> Result<Vec<String>, FetchError> {
        if !self.offers_period(period) {
            debug!("Period {:?} is outside the catalog", period);
            return Ok(Vec::new());
        }

        Ok(self
            .config
            .formats
            .iter()
            .filter(|f| is_supported_format(f))
            .cloned()
            .collect())
    }

    async fn fetch_raw_document(
        &self,
        period: &str,
        format: &str,
    ) -> Result<RawStatsDocument, FetchError> {
        let url = self.document_url(period, format)?;
        info!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        if let Some(size) = response.content_length() {
            let size = size as usize;
            if size > self.config.max_content_size {
                return Err(FetchError::ContentTooLarge {
                    size,
                    max_size: self.config.max_content_size,
                });
            }
        }

        let content = response.bytes().await?;
        if content.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len(),
                max_size: self.config.max_content_size,
            });
        }

        let document: RawStatsDocument = serde_json::from_slice(&content)?;
        debug!(
            "Parsed {} entities from {} ({} bytes)",
            document.data.len(),
            url,
            content.len()
        );
        Ok(document)
    }
}

/// In-memory source for tests.
#[cfg(test)]
pub struct MockSource {
    documents: std::collections::HashMap<(String, String), RawStatsDocument>,
    periods: Vec<String>,
    fail: std::sync::atomic::AtomicBool,
    delay: Duration,
    fetches: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSource {
    pub fn new() -> Self {
        Self {
            documents: std::collections::HashMap::new(),
            periods: Vec::new(),
            fail: std::sync::atomic::AtomicBool::new(false),
            delay: Duration::ZERO,
            fetches: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn with_document(mut self, period: &str, format: &str, document: RawStatsDocument) -> Self {
        self.documents
            .insert((period.to_string(), format.to_string()), document);
        if !self.periods.iter().any(|p| p == period) {
            self.periods.push(period.to_string());
            self.periods.sort();
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every subsequent call fail as if the upstream were down.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of raw document fetches attempted.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<(), FetchError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            Err(FetchError::HttpStatus {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[async_trait]
impl StatsSource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_periods(&self) -> Result<Vec<String>, FetchError> {
        self.check_failing()?;
        Ok(self.periods.clone())
    }

    async fn fetch_formats(&self, period: &str) -> Result<Vec<String>, FetchError> {
        self.check_failing()?;
        let mut formats: Vec<String> = self
            .documents
            .keys()
            .filter(|(p, _)| p == period)
            .map(|(_, f)| f.clone())
            .collect();
        formats.sort();
        Ok(formats)
    }

    async fn fetch_raw_document(
        &self,
        period: &str,
        format: &str,
    ) -> Result<RawStatsDocument, FetchError> {
        self.fetches
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.check_failing()?;
        self.documents
            .get(&(period.to_string(), format.to_string()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("{}/{}", period, format)))
    }
}
