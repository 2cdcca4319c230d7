//! # Usage Meta
//!
//! Derived competitive usage statistics from monthly upstream usage documents.
//!
//! ## Architecture
//!
//! - **models**: Raw documents and derived overview/detail structures
//! - **calculate**: Pure derivations (rankings, breakdowns, stat distributions)
//! - **reference**: Base stats and restricted list tables
//! - **fetch**: Upstream source trait and HTTP implementation
//! - **cache**: Time-bounded read-through caches
//! - **service**: Orchestration of fetch, derivation and caching
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod cache;
pub mod calculate;
pub mod config;
pub mod fetch;
pub mod models;
pub mod reference;
pub mod service;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num.checked_mul(multiplier)?))
}
