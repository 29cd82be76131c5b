//! Per-player trend cache.
//!
//! Trend lookups used to be fired one per table row with no coordination.
//! Here every (player, days) key has its own async slot: concurrent lookups
//! of the same key wait on the slot and share a single backend call, entries
//! expire after a TTL, and batch lookups run through a semaphore so at most
//! `concurrency` requests are in flight.
//!
//! Slots that hold nothing usable are dropped: a failed fetch removes its
//! slot, and expired slots nobody is waiting on are swept whenever a new key
//! is added. The map therefore only grows with fresh entries.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{ClientError, HealthApi};
use crate::models::PlayerTrend;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TrendKey {
    player_id: String,
    days: u32,
}

#[derive(Debug, Clone)]
struct CachedTrend {
    trend: PlayerTrend,
    fetched_at: DateTime<Utc>,
}

type Slot = Arc<Mutex<Option<CachedTrend>>>;

/// Maximum player ids accepted in one batched lookup.
pub const MAX_BATCH_IDS: usize = 200;

/// Result of a batched lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendBatch {
    pub trends: BTreeMap<String, PlayerTrend>,
    /// Player id -> error message.
    pub failed: BTreeMap<String, String>,
}

/// TTL cache of player trends in front of a `HealthApi`.
pub struct TrendCache {
    api: Arc<dyn HealthApi>,
    ttl: Duration,
    concurrency: usize,
    slots: Mutex<HashMap<TrendKey, Slot>>,
}

impl TrendCache {
    pub fn new(api: Arc<dyn HealthApi>, ttl: std::time::Duration, concurrency: usize) -> Self {
        Self {
            api,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(36_500)),
            concurrency: concurrency.max(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, key: &TrendKey) -> Slot {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get(key) {
            return slot.clone();
        }

        let before = slots.len();
        slots.retain(|_, slot| self.is_live(slot));
        if slots.len() < before {
            debug!("Swept {} expired trend slots", before - slots.len());
        }

        slots.entry(key.clone()).or_default().clone()
    }

    /// A slot is live while someone outside the map holds it, or while it
    /// holds a fresh trend.
    fn is_live(&self, slot: &Slot) -> bool {
        if Arc::strong_count(slot) > 1 {
            return true;
        }
        match slot.try_lock() {
            Ok(entry) => entry.as_ref().is_some_and(|cached| self.is_fresh(cached)),
            Err(_) => true,
        }
    }

    /// Remove `key` if it still maps to `slot` and the slot is empty and
    /// unused by anyone else.
    async fn forget_empty(&self, key: &TrendKey, slot: Slot) {
        let mut slots = self.slots.lock().await;
        let unused = slots.get(key).is_some_and(|current| Arc::ptr_eq(current, &slot))
            && Arc::strong_count(&slot) == 2
            && slot.try_lock().is_ok_and(|entry| entry.is_none());
        if unused {
            slots.remove(key);
        }
    }

    fn is_fresh(&self, cached: &CachedTrend) -> bool {
        Utc::now().signed_duration_since(cached.fetched_at) < self.ttl
    }

    /// Trend for one player, from cache when fresh.
    ///
    /// Failed lookups are not cached.
    pub async fn get(&self, player_id: &str, days: u32) -> Result<PlayerTrend, ClientError> {
        let key = TrendKey {
            player_id: player_id.to_string(),
            days,
        };
        let slot = self.slot(&key).await;

        // Held across the fetch so concurrent callers for this key wait for it
        let mut entry = slot.lock().await;
        if let Some(cached) = entry.as_ref() {
            if self.is_fresh(cached) {
                debug!("Trend cache hit for {} ({} days)", player_id, days);
                return Ok(cached.trend.clone());
            }
        }

        debug!("Fetching trend for {} ({} days)", player_id, days);
        match self.api.player_trend(player_id, days).await {
            Ok(trend) => {
                *entry = Some(CachedTrend {
                    trend: trend.clone(),
                    fetched_at: Utc::now(),
                });
                Ok(trend)
            }
            Err(e) => {
                *entry = None;
                drop(entry);
                self.forget_empty(&key, slot).await;
                Err(e)
            }
        }
    }

    /// Trends for many players with at most `concurrency` fetches in flight.
    ///
    /// Duplicate ids are looked up once. A failing player does not fail the
    /// batch; it is reported in `failed`.
    pub async fn get_many(self: &Arc<Self>, player_ids: &[String], days: u32) -> TrendBatch {
        let unique: BTreeSet<String> = player_ids.iter().cloned().collect();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for player_id in unique {
            let cache = Arc::clone(self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => cache.get(&player_id, days).await,
                    Err(_) => Err(ClientError::Rejected("trend lookup cancelled".to_string())),
                };
                (player_id, result)
            });
        }

        let mut batch = TrendBatch::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((player_id, Ok(trend))) => {
                    batch.trends.insert(player_id, trend);
                }
                Ok((player_id, Err(e))) => {
                    warn!("Trend lookup failed for {}: {}", player_id, e);
                    batch.failed.insert(player_id, e.to_string());
                }
                Err(e) => warn!("Trend lookup task failed: {}", e),
            }
        }

        batch
    }

    /// Drop every cached entry for a player.
    pub async fn invalidate(&self, player_id: &str) {
        let mut slots = self.slots.lock().await;
        slots.retain(|key, _| key.player_id != player_id);
    }

    /// Drop all cached entries.
    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }

    /// Number of keys with a slot (cached or in flight).
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
