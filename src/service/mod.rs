//! Stats service.
//!
//! Coordinates the derivation pipeline:
//! 1. Serve cached overviews and details while fresh
//! 2. Fetch the raw document from the source on a miss, bounded by a timeout
//! 3. Aggregate usage and derive entity details
//! 4. Store successful results; failures are surfaced and never cached

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::cache::{
    listing_cache, CacheStats, DerivationCache, DetailKey, ListingCache, ListingKey, OverviewKey,
    LISTING_TTL,
};
use crate::calculate::{aggregate_usage, calculate_entity_detail};
use crate::fetch::{FetchError, StatsSource};
use crate::models::{EntityDetail, Overview, RawStatsDocument};
use crate::reference::{BaseStatsLookup, RestrictedList};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced to callers of the service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<FetchError> for ServiceError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::NotFound(what) => ServiceError::NotFound(what),
            FetchError::InvalidUrl(what) => ServiceError::NotFound(what),
            other => ServiceError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Counters for every cache the service owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceCacheStats {
    pub overviews: CacheStats,
    pub details: CacheStats,
    pub listings: CacheStats,
}

/// Read-through access to derived usage statistics.
pub struct StatsService {
    source: Arc<dyn StatsSource>,
    base_stats: Arc<dyn BaseStatsLookup>,
    restricted: Arc<dyn RestrictedList>,
    cache: DerivationCache,
    listings: ListingCache,
    fetch_timeout: Duration,
}

impl StatsService {
    /// Create a service with default TTLs and fetch timeout.
    pub fn new(
        source: Arc<dyn StatsSource>,
        base_stats: Arc<dyn BaseStatsLookup>,
        restricted: Arc<dyn RestrictedList>,
    ) -> Self {
        Self {
            source,
            base_stats,
            restricted,
            cache: DerivationCache::default(),
            listings: listing_cache(LISTING_TTL),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_cache(mut self, cache: DerivationCache, listings: ListingCache) -> Self {
        self.cache = cache;
        self.listings = listings;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Run an upstream call under the fetch timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        tokio::time::timeout(self.fetch_timeout, call)
            .await
            .unwrap_or(Err(FetchError::Timeout(self.fetch_timeout)))
    }

    async fn fetch_document(
        &self,
        period: &str,
        format: &str,
    ) -> Result<RawStatsDocument, ServiceError> {
        info!(
            "Fetching {} {} from {}",
            period,
            format,
            self.source.name()
        );

        match self
            .bounded(self.source.fetch_raw_document(period, format))
            .await
        {
            Ok(document) => Ok(document),
            Err(FetchError::NotFound(what)) => {
                info!("No usage data at {}", what);
                Err(ServiceError::NotFound(format!(
                    "no usage data for {} {}",
                    period, format
                )))
            }
            Err(e) => {
                error!("Failed to fetch {} {}: {}", period, format, e);
                Err(e.into())
            }
        }
    }

    async fn build_overview(&self, period: &str, format: &str) -> Result<Arc<Overview>, ServiceError> {
        let document = self.fetch_document(period, format).await?;
        if document.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "no usage data for {} {}",
                period, format
            )));
        }

        let summary = aggregate_usage(&document, self.restricted.as_ref());
        info!(
            "Derived overview for {} {}: {} ranked entities",
            period,
            format,
            summary.ranked_list.len()
        );

        Ok(Arc::new(Overview::new(
            period,
            format,
            Arc::new(document),
            summary,
        )))
    }

    /// Usage overview for a period and format.
    pub async fn get_overview(&self, period: &str, format: &str) -> Result<Arc<Overview>, ServiceError> {
        self.cache
            .overviews
            .get_or_try_insert_with(OverviewKey::new(period, format), || {
                self.build_overview(period, format)
            })
            .await
    }

    /// Breakdown for one entity. Fetches the overview first if it is not cached.
    pub async fn get_detail(
        &self,
        period: &str,
        format: &str,
        name: &str,
    ) -> Result<Arc<EntityDetail>, ServiceError> {
        let key = DetailKey::new(period, format, name);
        self.cache
            .details
            .get_or_try_insert_with(key, || async {
                let overview = self.get_overview(period, format).await?;
                let record = overview.document.get(name).ok_or_else(|| {
                    ServiceError::NotFound(format!("{} not found in {} {}", name, period, format))
                })?;

                let base_stats = self.base_stats.base_stats(name);
                if base_stats.is_none() {
                    debug!("No base stats for {}, distributions left empty", name);
                }

                Ok::<_, ServiceError>(Arc::new(EntityDetail {
                    name: name.to_string(),
                    period: period.to_string(),
                    format: format.to_string(),
                    is_restricted: self.restricted.is_restricted(name),
                    ..calculate_entity_detail(record, base_stats.as_ref())
                }))
            })
            .await
    }

    /// Available periods, ascending.
    pub async fn periods(&self) -> Result<Vec<String>, ServiceError> {
        self.listings
            .get_or_try_insert_with(ListingKey::Periods, || async {
                self.bounded(self.source.fetch_periods())
                    .await
                    .map_err(|e| {
                        error!("Failed to list periods: {}", e);
                        ServiceError::from(e)
                    })
            })
            .await
    }

    /// Formats for a period. A blank period has none.
    pub async fn formats(&self, period: &str) -> Result<Vec<String>, ServiceError> {
        let period = period.trim();
        if period.is_empty() {
            return Ok(Vec::new());
        }

        self.listings
            .get_or_try_insert_with(ListingKey::Formats(period.to_string()), || async {
                self.bounded(self.source.fetch_formats(period))
                    .await
                    .map_err(|e| {
                        error!("Failed to list formats for {}: {}", period, e);
                        ServiceError::from(e)
                    })
            })
            .await
    }

    pub async fn cache_stats(&self) -> ServiceCacheStats {
        ServiceCacheStats {
            overviews: self.cache.overviews.stats().await,
            details: self.cache.details.stats().await,
            listings: self.listings.stats().await,
        }
    }
}
