//! Historical snapshots, per-player trends and backend response payloads.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{FilterSelection, LegacyBucket, PlayerRecord, Summary};

/// A persisted point-in-time copy of aggregate statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: i64,

    /// Snapshot date, normally "YYYY-MM-DD".
    pub data: String,

    /// When the snapshot was written (ISO 8601).
    #[serde(default)]
    pub data_timestamp: String,

    #[serde(default)]
    pub total_jogadores: u64,
    #[serde(default)]
    pub percentual_ativos: f64,

    #[serde(default)]
    pub media_score_geral: f64,
    #[serde(default)]
    pub media_score_login: f64,
    #[serde(default)]
    pub media_score_engajamento: f64,
    #[serde(default)]
    pub media_score_compras: f64,

    /// Legacy cluster name -> player count. Null counts read as 0.
    #[serde(default, deserialize_with = "counts_or_zero")]
    pub clusters: BTreeMap<String, u64>,

    #[serde(default = "all_filter")]
    pub filtro_regiao: String,
    #[serde(default = "all_filter")]
    pub filtro_vip: String,
}

fn all_filter() -> String {
    "all".to_string()
}

fn counts_or_zero<'de, D>(deserializer: D) -> Result<BTreeMap<String, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<u64>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, count)| (name, count.unwrap_or(0)))
        .collect())
}

impl SnapshotRecord {
    /// Parsed snapshot date. Accepts ISO and day-first dates.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(&self.data)
    }

    /// Parsed write timestamp.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.data_timestamp.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }

    /// Count stored for a legacy cluster.
    pub fn cluster_count(&self, bucket: LegacyBucket) -> u64 {
        self.clusters.get(bucket.label()).copied().unwrap_or(0)
    }
}

/// Parse "YYYY-MM-DD" or "DD/MM/YYYY".
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

/// Body of a save-snapshot request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRequest {
    #[serde(default)]
    pub filtros: FilterSelection,

    /// Snapshot date; the backend uses today when absent.
    #[serde(default)]
    pub data: Option<NaiveDate>,
}

/// Result of saving a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSnapshot {
    pub data: String,
    #[serde(default)]
    pub snapshot_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// History query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub filtros: FilterSelection,
    #[serde(default = "default_history_days")]
    pub dias: u32,
}

fn default_history_days() -> u32 {
    30
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            filtros: FilterSelection::all(),
            dias: default_history_days(),
        }
    }
}

/// One point of a player's score history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistPoint {
    pub data: String,
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default)]
    pub score_geral: f64,
    #[serde(default)]
    pub score_login: f64,
    #[serde(default)]
    pub score_engajamento: f64,
    #[serde(default)]
    pub score_compras: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Score evolution of a single player across stored history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTrend {
    pub player_id: String,
    #[serde(default)]
    pub cluster_atual: Option<String>,
    #[serde(default)]
    pub evolucao: Vec<HistPoint>,
    #[serde(default)]
    pub resumo: Value,
    #[serde(default)]
    pub metricas_compras: Value,
    #[serde(default)]
    pub metricas_engajamento: Value,
    #[serde(default)]
    pub variacoes: Value,
    #[serde(default)]
    pub dias_no_cluster_atual: u32,
    #[serde(default)]
    pub total_registros: u32,
}

/// Most-recent record per player across history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestPlayers {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub jogadores: Vec<PlayerRecord>,
}

/// Full dataset as served by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub dados_completos: Vec<PlayerRecord>,
    #[serde(default)]
    pub resumo: Option<Summary>,
}

/// Result of an upload or sample-data load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub resumo: Summary,
    #[serde(default)]
    pub message: Option<String>,
}

/// One legacy cluster in the executive summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterShare {
    pub qtd: u64,
    /// Percent of the snapshot total, 1 decimal.
    pub pct: f64,
}

/// Day-over-day deltas between the two latest snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotVariation {
    pub total_jogadores: i64,
    pub percentual_ativos: f64,
    pub score_geral: f64,
}

/// Headline indicators of the latest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub total_jogadores: u64,
    pub percentual_ativos: f64,
    pub score_geral_medio: f64,
    pub score_engajamento_medio: f64,
    pub score_compras_medio: f64,
}

/// Trimmed history point for the executive view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionPoint {
    pub data: String,
    pub total_jogadores: u64,
    pub percentual_ativos: f64,
    pub score_geral: f64,
}

/// Presentation-ready digest of stored history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub data_referencia: String,
    pub indicadores_principais: Indicators,
    /// Absent when only one snapshot exists.
    pub variacoes_dia: Option<SnapshotVariation>,
    /// Short legacy cluster name -> share.
    pub distribuicao_clusters: BTreeMap<String, ClusterShare>,
    /// Most recent first.
    pub evolucao: Vec<EvolutionPoint>,
}

/// Date range covered by a period comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub inicio: NaiveDate,
    pub fim: NaiveDate,
    /// Snapshots found in the range.
    pub dias: usize,
}

/// Averages over every snapshot in a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodMeans {
    /// Rounded to a whole player.
    pub total_jogadores: f64,
    pub percentual_ativos: f64,
    pub score_geral: f64,
}

/// Snapshots between two dates: averages, first-to-last change and the
/// daily series, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub periodo: PeriodRange,
    pub medias: PeriodMeans,
    pub tendencia: SnapshotVariation,
    pub evolucao_diaria: Vec<EvolutionPoint>,
}
