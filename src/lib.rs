//! # Health Dashboard
//!
//! Aggregation and filtering core of the player health score dashboard.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (players, VIP tiers, taxonomy, summaries, snapshots)
//! - **calculate**: Filtering, distributions, VIP/region cohorts and summary recomputation
//! - **dashboard**: Injectable dashboard state and the controller that feeds it
//! - **client**: Scoring backend API client and player trend cache
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod models;

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
