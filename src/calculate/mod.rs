//! Aggregation engine.
//!
//! Pure functions that turn a player collection plus the active filters into
//! the derived summary consumed by the dashboard:
//! - Region/VIP filtering
//! - Counter mean / median / standard deviation
//! - Category distribution (current and legacy taxonomies)
//! - VIP cohort and region analysis
//! - Summary recomputation for a filter selection
//! - Snapshot history normalization
//!
//! None of these perform I/O and none mutate their input.

mod distribution;
mod filter;
mod history;
mod stats;
mod summary;
mod vip;

pub use distribution::*;
pub use filter::*;
pub use history::*;
pub use stats::*;
pub use summary::*;
pub use vip::*;

/// Login score at or above which a cohort member counts as active.
pub const ACTIVE_LOGIN_SCORE: f64 = 50.0;

/// Maximum length of `top_jogadores`.
pub const TOP_PLAYERS_LIMIT: usize = 10;

/// Maximum length of each risk list and cluster list.
pub const RISK_LIST_LIMIT: usize = 50;

/// Length of the per-cohort / per-region leaderboard.
pub const COHORT_TOP_LIMIT: usize = 3;

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 1 decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Arithmetic mean; 0 for an empty sequence.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Median (average of the two middle values for even lengths); 0 when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation; 0 when empty.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// `part / total * 100`; 0 when `total` is 0.
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
