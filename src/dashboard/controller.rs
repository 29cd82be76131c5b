//! Dashboard controller.
//!
//! Owns one `DashboardState` and the backend it is fed from. Loads go through
//! a ticket so that only the newest one is applied; everything else is a thin
//! pass-through to the backend with logging.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{DashboardError, DashboardState, LoadTicket};
use crate::calculate::{compare_periods, executive_summary, normalize_history};
use crate::client::{ClientError, ExportFormat, HealthApi, TrendBatch, TrendCache, UploadFile};
use crate::models::{
    Dataset, ExecutiveSummary, FilterSelection, HistoryQuery, LatestPlayers, PeriodComparison,
    PlayerRecord, PlayerTrend, SavedSnapshot, SnapshotRecord, SnapshotRequest, Summary, Taxonomy,
};

#[derive(Clone)]
pub struct DashboardController {
    api: Arc<dyn HealthApi>,
    state: Arc<RwLock<DashboardState>>,
    trends: Arc<TrendCache>,
}

impl DashboardController {
    pub fn new(
        api: Arc<dyn HealthApi>,
        taxonomy: Arc<Taxonomy>,
        trend_ttl: Duration,
        trend_concurrency: usize,
    ) -> Self {
        let trends = Arc::new(TrendCache::new(Arc::clone(&api), trend_ttl, trend_concurrency));
        Self {
            api,
            state: Arc::new(RwLock::new(DashboardState::new(taxonomy))),
            trends,
        }
    }

    pub fn api_name(&self) -> &'static str {
        self.api.name()
    }

    pub fn state(&self) -> &Arc<RwLock<DashboardState>> {
        &self.state
    }

    pub fn trend_cache(&self) -> &Arc<TrendCache> {
        &self.trends
    }

    pub async fn summary(&self) -> Arc<Summary> {
        self.state.read().await.current_summary()
    }

    /// Players matching the active filter.
    pub async fn players(&self) -> Arc<Vec<PlayerRecord>> {
        self.state.read().await.current_players()
    }

    pub async fn filter(&self) -> FilterSelection {
        self.state.read().await.filter()
    }

    pub async fn taxonomy(&self) -> Arc<Taxonomy> {
        Arc::clone(self.state.read().await.taxonomy())
    }

    /// Re-fetch the processed dataset from the backend.
    pub async fn reload(&self) -> Result<Arc<Summary>, DashboardError> {
        let ticket = self.state.write().await.begin_load();
        let dataset = self.api.fetch_dataset().await.inspect_err(|e| {
            warn!("Dataset load from {} failed: {}", self.api.name(), e);
        })?;

        self.install(ticket, dataset.dados_completos, dataset.resumo)
            .await
    }

    /// Send a spreadsheet for scoring and load the result.
    pub async fn upload(&self, file: UploadFile) -> Result<Arc<Summary>, DashboardError> {
        info!("Uploading {} ({} bytes)", file.name(), file.len());
        let ticket = self.state.write().await.begin_load();

        let outcome = self.api.upload(file).await?;
        let dataset = self.api.fetch_dataset().await?;

        self.install(ticket, dataset.dados_completos, Some(outcome.resumo))
            .await
    }

    /// Generate the sample dataset on the backend and load it.
    pub async fn load_sample(&self) -> Result<Arc<Summary>, DashboardError> {
        let ticket = self.state.write().await.begin_load();

        let outcome = self.api.load_sample().await?;
        let dataset = self.api.fetch_dataset().await?;

        self.install(ticket, dataset.dados_completos, Some(outcome.resumo))
            .await
    }

    /// Load a dataset that did not come from the backend (offline dumps).
    pub async fn load_dataset(&self, dataset: Dataset) -> Result<Arc<Summary>, DashboardError> {
        let ticket = self.state.write().await.begin_load();
        self.install(ticket, dataset.dados_completos, dataset.resumo)
            .await
    }

    async fn install(
        &self,
        ticket: LoadTicket,
        players: Vec<PlayerRecord>,
        summary: Option<Summary>,
    ) -> Result<Arc<Summary>, DashboardError> {
        let current = {
            let mut state = self.state.write().await;
            if !state.complete_load(ticket, players, summary) {
                return Err(DashboardError::Superseded);
            }
            state.current_summary()
        };

        // Trends belong to the previous dataset
        self.trends.clear().await;
        Ok(current)
    }

    pub async fn apply_filter(&self, filter: FilterSelection) -> Arc<Summary> {
        info!("Applying filter regiao={} vip={}", filter.regiao, filter.vip);
        self.state.write().await.set_filter(filter)
    }

    /// Persist a snapshot of the active filter's statistics.
    pub async fn save_snapshot(&self, date: Option<NaiveDate>) -> Result<SavedSnapshot, DashboardError> {
        let request = SnapshotRequest {
            filtros: self.filter().await,
            data: date,
        };

        let saved = self.api.save_snapshot(&request).await?;
        info!("Saved snapshot for {} (id {:?})", saved.data, saved.snapshot_id);
        Ok(saved)
    }

    /// Snapshots for the active filter, oldest first.
    pub async fn history(&self, dias: u32) -> Result<Vec<SnapshotRecord>, DashboardError> {
        let query = HistoryQuery {
            filtros: self.filter().await,
            dias,
        };
        let history = self.api.history(&query).await?;
        Ok(normalize_history(history))
    }

    pub async fn executive(&self, dias: u32) -> Result<ExecutiveSummary, DashboardError> {
        let history = self.history(dias).await?;
        executive_summary(&history).ok_or(DashboardError::NoHistory)
    }

    /// Compare the active filter's snapshots dated within `inicio..=fim`.
    pub async fn compare_periods(
        &self,
        inicio: NaiveDate,
        fim: NaiveDate,
    ) -> Result<PeriodComparison, DashboardError> {
        let rows = rows_covering(inicio, fim, Local::now().date_naive());
        let history = self.history(rows).await?;
        compare_periods(&history, inicio, fim).ok_or(DashboardError::NoHistory)
    }

    pub async fn delete_snapshot(&self, id: i64) -> Result<(), DashboardError> {
        self.api.delete_snapshot(id).await?;
        info!("Deleted snapshot {}", id);
        Ok(())
    }

    /// Delete every snapshot stored for `date`, whatever its filters.
    pub async fn delete_snapshots_on(&self, date: NaiveDate) -> Result<(), DashboardError> {
        self.api.delete_snapshots_on(date).await?;
        info!("Deleted snapshots of {}", date);
        Ok(())
    }

    pub async fn player_trend(&self, player_id: &str, days: u32) -> Result<PlayerTrend, DashboardError> {
        Ok(self.trends.get(player_id, days).await?)
    }

    /// Trends for a batch of players, sharing cached entries.
    pub async fn player_trends(&self, player_ids: &[String], days: u32) -> TrendBatch {
        self.trends.get_many(player_ids, days).await
    }

    /// Forget cached trends for a player so the next lookup refetches.
    pub async fn refresh_trend(&self, player_id: &str) {
        self.trends.invalidate(player_id).await;
    }

    pub async fn latest_players(&self, days: u32) -> Result<LatestPlayers, DashboardError> {
        Ok(self.api.latest_players(days).await?)
    }

    pub async fn export(&self, format: ExportFormat) -> Result<Vec<u8>, DashboardError> {
        let bytes = self.api.export(format).await?;
        if bytes.is_empty() {
            return Err(ClientError::Rejected(format!("empty {} export", format)).into());
        }
        Ok(bytes)
    }
}

/// History rows to request so that, at one snapshot per day, the oldest
/// returned row reaches back to `inicio`.
fn rows_covering(inicio: NaiveDate, fim: NaiveDate, today: NaiveDate) -> u32 {
    let back = (today - inicio).num_days() + 1;
    let span = (fim - inicio).num_days() + 1;
    back.max(span).clamp(1, i64::from(u32::MAX)) as u32
}
