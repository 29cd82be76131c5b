//! In-memory `HealthApi` for tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{ClientError, ExportFormat, HealthApi, UploadFile};
use crate::models::{
    Dataset, HistoryQuery, LatestPlayers, LoadOutcome, PlayerRecord, PlayerTrend, SavedSnapshot,
    SnapshotRecord, SnapshotRequest, Summary,
};

/// Scriptable backend double.
pub struct MockHealthApi {
    dataset: Mutex<Dataset>,
    scripted_loads: Mutex<VecDeque<(Duration, Dataset)>>,
    snapshots: Mutex<Vec<SnapshotRecord>>,
    saved_requests: Mutex<Vec<SnapshotRequest>>,
    failing_trends: HashSet<String>,
    fail_dataset: bool,
    trend_delay: Duration,
    trend_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockHealthApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHealthApi {
    pub fn new() -> Self {
        Self {
            dataset: Mutex::new(Dataset::default()),
            scripted_loads: Mutex::new(VecDeque::new()),
            snapshots: Mutex::new(Vec::new()),
            saved_requests: Mutex::new(Vec::new()),
            failing_trends: HashSet::new(),
            fail_dataset: false,
            trend_delay: Duration::ZERO,
            trend_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_dataset(self, players: Vec<PlayerRecord>, resumo: Option<Summary>) -> Self {
        *self.dataset.lock().unwrap() = Dataset {
            dados_completos: players,
            resumo,
        };
        self
    }

    /// Queue a response for the next `fetch_dataset` call, delivered after `delay`.
    pub fn with_scripted_load(self, delay: Duration, dataset: Dataset) -> Self {
        self.scripted_loads.lock().unwrap().push_back((delay, dataset));
        self
    }

    pub fn with_snapshots(self, snapshots: Vec<SnapshotRecord>) -> Self {
        *self.snapshots.lock().unwrap() = snapshots;
        self
    }

    pub fn with_failing_trend(mut self, player_id: &str) -> Self {
        self.failing_trends.insert(player_id.to_string());
        self
    }

    pub fn with_trend_delay(mut self, delay: Duration) -> Self {
        self.trend_delay = delay;
        self
    }

    pub fn failing_dataset(mut self) -> Self {
        self.fail_dataset = true;
        self
    }

    pub fn trend_calls(&self) -> usize {
        self.trend_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_trends(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn saved_requests(&self) -> Vec<SnapshotRequest> {
        self.saved_requests.lock().unwrap().clone()
    }

    pub fn snapshot_ids(&self) -> Vec<i64> {
        self.snapshots.lock().unwrap().iter().map(|s| s.id).collect()
    }

    fn current_summary(&self) -> Summary {
        self.dataset.lock().unwrap().resumo.clone().unwrap_or_default()
    }
}

#[async_trait]
impl HealthApi for MockHealthApi {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_dataset(&self) -> Result<Dataset, ClientError> {
        if self.fail_dataset {
            return Err(ClientError::HttpStatus {
                status: 503,
                message: "backend down".to_string(),
            });
        }

        let scripted = self.scripted_loads.lock().unwrap().pop_front();
        match scripted {
            Some((delay, dataset)) => {
                tokio::time::sleep(delay).await;
                Ok(dataset)
            }
            None => Ok(self.dataset.lock().unwrap().clone()),
        }
    }

    async fn upload(&self, _file: UploadFile) -> Result<LoadOutcome, ClientError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(LoadOutcome {
            resumo: self.current_summary(),
            message: Some("uploaded".to_string()),
        })
    }

    async fn load_sample(&self) -> Result<LoadOutcome, ClientError> {
        Ok(LoadOutcome {
            resumo: self.current_summary(),
            message: Some("sample".to_string()),
        })
    }

    async fn history(&self, query: &HistoryQuery) -> Result<Vec<SnapshotRecord>, ClientError> {
        let regiao = query.filtros.regiao.to_string();
        let vip = query.filtros.vip.to_string();

        // Newest first, like the real backend
        let mut matching: Vec<SnapshotRecord> = self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| regiao == "all" || s.filtro_regiao == regiao)
            .filter(|s| vip == "all" || s.filtro_vip == vip)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.data_timestamp.cmp(&a.data_timestamp));
        matching.truncate(query.dias as usize);

        Ok(matching)
    }

    async fn save_snapshot(&self, request: &SnapshotRequest) -> Result<SavedSnapshot, ClientError> {
        let summary = self.current_summary();
        let data = request
            .data
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "2025-01-01".to_string());

        let mut snapshots = self.snapshots.lock().unwrap();
        let id = snapshots.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        snapshots.push(SnapshotRecord {
            id,
            data: data.clone(),
            data_timestamp: format!("{}T12:00:00", data),
            total_jogadores: summary.total_jogadores,
            percentual_ativos: summary.percentual_ativos,
            media_score_geral: summary.media_pontuacao_geral,
            media_score_login: summary.media_saude_login,
            media_score_engajamento: summary.media_saude_engajamento,
            media_score_compras: summary.media_saude_compras,
            clusters: Default::default(),
            filtro_regiao: request.filtros.regiao.to_string(),
            filtro_vip: request.filtros.vip.to_string(),
        });
        self.saved_requests.lock().unwrap().push(request.clone());

        Ok(SavedSnapshot {
            data,
            snapshot_id: Some(id),
            message: None,
        })
    }

    async fn delete_snapshot(&self, id: i64) -> Result<(), ClientError> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let before = snapshots.len();
        snapshots.retain(|s| s.id != id);

        if snapshots.len() == before {
            return Err(ClientError::HttpStatus {
                status: 404,
                message: "Snapshot não encontrado".to_string(),
            });
        }
        Ok(())
    }

    async fn delete_snapshots_on(&self, date: NaiveDate) -> Result<(), ClientError> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let before = snapshots.len();
        snapshots.retain(|s| s.date() != Some(date));

        if snapshots.len() == before {
            return Err(ClientError::HttpStatus {
                status: 404,
                message: "Nenhum snapshot encontrado para esta data".to_string(),
            });
        }
        Ok(())
    }

    async fn player_trend(&self, player_id: &str, days: u32) -> Result<PlayerTrend, ClientError> {
        self.trend_calls.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.trend_delay.is_zero() {
            tokio::time::sleep(self.trend_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_trends.contains(player_id) {
            return Err(ClientError::HttpStatus {
                status: 500,
                message: format!("no history for {}", player_id),
            });
        }

        Ok(PlayerTrend {
            player_id: player_id.to_string(),
            cluster_atual: None,
            evolucao: Vec::new(),
            resumo: serde_json::Value::Null,
            metricas_compras: serde_json::Value::Null,
            metricas_engajamento: serde_json::Value::Null,
            variacoes: serde_json::Value::Null,
            dias_no_cluster_atual: 0,
            total_registros: days,
        })
    }

    async fn latest_players(&self, _days: u32) -> Result<LatestPlayers, ClientError> {
        let players = self.dataset.lock().unwrap().dados_completos.clone();
        Ok(LatestPlayers {
            total: players.len() as u64,
            jogadores: players,
        })
    }

    async fn export(&self, format: ExportFormat) -> Result<Vec<u8>, ClientError> {
        match format {
            ExportFormat::Csv => {
                let mut out = String::from("player_id\n");
                for player in &self.dataset.lock().unwrap().dados_completos {
                    out.push_str(&player.player_id);
                    out.push('\n');
                }
                Ok(out.into_bytes())
            }
            ExportFormat::Excel => Ok(vec![0x50, 0x4b, 0x03, 0x04]),
        }
    }
}
