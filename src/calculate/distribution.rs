use std::collections::BTreeMap;

use tracing::debug;

use super::{percent, round2};
use crate::models::{LegacyBucket, PlayerRecord, Taxonomy};

/// Number of players per taxonomy key, in taxonomy order.
///
/// Every key is present. Players whose label the taxonomy does not know are
/// left out of every bucket.
pub fn category_counts(players: &[PlayerRecord], taxonomy: &Taxonomy) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = taxonomy.keys().map(|k| (k.to_string(), 0)).collect();
    let mut unknown = 0usize;

    for player in players {
        match taxonomy.resolve(&player.categoria) {
            Some(category) => {
                if let Some(slot) = counts.iter_mut().find(|(key, _)| *key == category.key) {
                    slot.1 += 1;
                }
            }
            None => unknown += 1,
        }
    }

    if unknown > 0 {
        debug!(
            "{} players with categories outside the {} taxonomy",
            unknown, taxonomy.name
        );
    }

    counts
}

/// Percentage of the subset in each taxonomy category.
///
/// Each share is `count / subset size * 100` rounded to 2 decimals, so the
/// total can drift from 100 by the accumulated rounding. An empty subset
/// yields every key at 0.
pub fn distribution(players: &[PlayerRecord], taxonomy: &Taxonomy) -> BTreeMap<String, f64> {
    let counts = category_counts(players, taxonomy);
    shares(counts, players.len()).collect()
}

/// Distribution collapsed onto the six legacy buckets.
pub fn legacy_distribution(
    players: &[PlayerRecord],
    taxonomy: &Taxonomy,
) -> BTreeMap<LegacyBucket, f64> {
    let counts = legacy_counts(players, taxonomy);
    shares(counts, players.len()).collect()
}

/// Players per legacy bucket, in bucket order.
pub fn legacy_counts(players: &[PlayerRecord], taxonomy: &Taxonomy) -> Vec<(LegacyBucket, usize)> {
    let mut counts: Vec<(LegacyBucket, usize)> = LegacyBucket::ALL.iter().map(|b| (*b, 0)).collect();

    for player in players {
        if let Some(category) = taxonomy.resolve(&player.categoria) {
            if let Some(slot) = counts.iter_mut().find(|(b, _)| *b == category.legacy_bucket) {
                slot.1 += 1;
            }
        }
    }

    counts
}

fn shares<K>(counts: Vec<(K, usize)>, total: usize) -> impl Iterator<Item = (K, f64)> {
    counts
        .into_iter()
        .map(move |(key, count)| (key, round2(percent(count, total))))
}
