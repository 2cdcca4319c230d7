//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::cache::{DerivationCache, ListingCache};
use crate::fetch::{self, FetcherConfig};
use crate::parse_duration;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Upstream source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root of the stats tree
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum document size in bytes
    #[serde(default = "default_max_content_size")]
    pub max_content_size: usize,

    /// Earliest period offered, `YYYY-MM`
    #[serde(default = "default_min_period")]
    pub min_period: String,

    /// Last period offered, `YYYY-MM`; unset runs through the last completed month
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_period: Option<String>,

    /// Formats offered for each period
    #[serde(default = "fetch::default_formats")]
    pub formats: Vec<String>,
}

fn default_base_url() -> String {
    fetch::DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("usage-meta/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_content_size() -> usize {
    64 * 1024 * 1024
}

fn default_min_period() -> String {
    fetch::DEFAULT_MIN_PERIOD.to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            max_content_size: default_max_content_size(),
            min_period: default_min_period(),
            max_period: None,
            formats: fetch::default_formats(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Build the HTTP source configuration. The base URL always ends in `/`
    /// so document paths join beneath it.
    pub fn fetcher_config(&self) -> Result<FetcherConfig, ConfigError> {
        let base = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };
        let base_url = Url::parse(&base)
            .map_err(|e| ConfigError::ValidationError(format!("Invalid base_url: {}", e)))?;

        Ok(FetcherConfig {
            base_url,
            timeout: self.timeout(),
            user_agent: self.user_agent.clone(),
            max_content_size: self.max_content_size,
            min_period: self.min_period.clone(),
            max_period: self.max_period.clone(),
            formats: self.formats.clone(),
        })
    }
}

/// Cache lifetimes, as duration strings (`"1h"`, `"30m"`, `"90s"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_overview_ttl")]
    pub overview_ttl: String,

    #[serde(default = "default_detail_ttl")]
    pub detail_ttl: String,

    #[serde(default = "default_listing_ttl")]
    pub listing_ttl: String,
}

fn default_overview_ttl() -> String {
    "1h".to_string()
}

fn default_detail_ttl() -> String {
    "1h".to_string()
}

fn default_listing_ttl() -> String {
    "6h".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            overview_ttl: default_overview_ttl(),
            detail_ttl: default_detail_ttl(),
            listing_ttl: default_listing_ttl(),
        }
    }
}

fn ttl(field: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| {
        ConfigError::ValidationError(format!("Invalid {}: {:?}", field, value))
    })
}

impl CacheConfig {
    pub fn overview_ttl(&self) -> Result<Duration, ConfigError> {
        ttl("overview_ttl", &self.overview_ttl)
    }

    pub fn detail_ttl(&self) -> Result<Duration, ConfigError> {
        ttl("detail_ttl", &self.detail_ttl)
    }

    pub fn listing_ttl(&self) -> Result<Duration, ConfigError> {
        ttl("listing_ttl", &self.listing_ttl)
    }

    /// Build the derivation and listing caches.
    pub fn build(&self) -> Result<(DerivationCache, ListingCache), ConfigError> {
        Ok((
            DerivationCache::new(self.overview_ttl()?, self.detail_ttl()?),
            crate::cache::listing_cache(self.listing_ttl()?),
        ))
    }
}

/// Reference table locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    #[serde(default = "default_pokedex_path")]
    pub pokedex_path: PathBuf,

    #[serde(default = "default_restricted_path")]
    pub restricted_path: PathBuf,
}

fn default_pokedex_path() -> PathBuf {
    PathBuf::from("./data/pokedex.json")
}

fn default_restricted_path() -> PathBuf {
    PathBuf::from("./data/restricted.json")
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            pokedex_path: default_pokedex_path(),
            restricted_path: default_restricted_path(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub reference: ReferenceConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            source: SourceConfig::default(),
            cache: CacheConfig::default(),
            reference: ReferenceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            info!("Loading config from {:?}", path);
            Self::from_file(path)
        } else {
            info!("No config at {:?}, using defaults", path);
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Source timeout must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !fetch::is_valid_period(&self.source.min_period) {
            return Err(ConfigError::ValidationError(format!(
                "min_period must be YYYY-MM, got {:?}",
                self.source.min_period
            )));
        }

        if let Some(max) = &self.source.max_period {
            if !fetch::is_valid_period(max) || max < &self.source.min_period {
                return Err(ConfigError::ValidationError(format!(
                    "max_period must be YYYY-MM and not before min_period, got {:?}",
                    max
                )));
            }
        }

        self.source.fetcher_config()?;
        self.cache.overview_ttl()?;
        self.cache.detail_ttl()?;
        self.cache.listing_ttl()?;

        Ok(())
    }
}
