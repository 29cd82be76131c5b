//! Derived summary models.
//!
//! Field names follow the backend's JSON so a server-computed summary and a
//! locally recomputed one are interchangeable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Counter, PlayerRecord, Region};

/// Mean / median / population standard deviation of one counter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterSummary {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

/// 3-day counter statistics (`estatisticas`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterStats {
    pub media_torneios_3d: f64,
    pub media_maratonas_3d: f64,
    pub media_missoes_3d: f64,
    pub media_promos_3d: f64,
    pub media_logins_3d: f64,

    pub mediana_torneios_3d: f64,
    pub mediana_maratonas_3d: f64,
    pub mediana_missoes_3d: f64,
    pub mediana_promos_3d: f64,
    pub mediana_logins_3d: f64,

    pub desvpad_torneios_3d: f64,
    pub desvpad_maratonas_3d: f64,
    pub desvpad_missoes_3d: f64,
    pub desvpad_promos_3d: f64,
    pub desvpad_logins_3d: f64,
}

impl CounterStats {
    /// Read back the summary for one counter.
    pub fn get(&self, counter: Counter) -> CounterSummary {
        let (mean, median, std_dev) = match counter {
            Counter::Torneios => (
                self.media_torneios_3d,
                self.mediana_torneios_3d,
                self.desvpad_torneios_3d,
            ),
            Counter::Maratonas => (
                self.media_maratonas_3d,
                self.mediana_maratonas_3d,
                self.desvpad_maratonas_3d,
            ),
            Counter::Missoes => (
                self.media_missoes_3d,
                self.mediana_missoes_3d,
                self.desvpad_missoes_3d,
            ),
            Counter::Promos => (
                self.media_promos_3d,
                self.mediana_promos_3d,
                self.desvpad_promos_3d,
            ),
            Counter::Logins => (
                self.media_logins_3d,
                self.mediana_logins_3d,
                self.desvpad_logins_3d,
            ),
        };
        CounterSummary {
            mean,
            median,
            std_dev,
        }
    }

    /// Store the summary for one counter.
    pub fn set(&mut self, counter: Counter, summary: CounterSummary) {
        let (mean, median, std_dev) = match counter {
            Counter::Torneios => (
                &mut self.media_torneios_3d,
                &mut self.mediana_torneios_3d,
                &mut self.desvpad_torneios_3d,
            ),
            Counter::Maratonas => (
                &mut self.media_maratonas_3d,
                &mut self.mediana_maratonas_3d,
                &mut self.desvpad_maratonas_3d,
            ),
            Counter::Missoes => (
                &mut self.media_missoes_3d,
                &mut self.mediana_missoes_3d,
                &mut self.desvpad_missoes_3d,
            ),
            Counter::Promos => (
                &mut self.media_promos_3d,
                &mut self.mediana_promos_3d,
                &mut self.desvpad_promos_3d,
            ),
            Counter::Logins => (
                &mut self.media_logins_3d,
                &mut self.mediana_logins_3d,
                &mut self.desvpad_logins_3d,
            ),
        };
        *mean = summary.mean;
        *median = summary.median;
        *std_dev = summary.std_dev;
    }

    /// Daily benchmark for a counter (3-day mean / 3).
    pub fn per_day(&self, counter: Counter) -> f64 {
        self.get(counter).mean / 3.0
    }
}

/// Per-tier VIP statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VipCohort {
    pub nivel: u8,
    pub nome: String,
    pub cor: String,
    pub icone: String,
    pub quantidade: u64,

    /// Share of the analysed subset, in percent.
    pub percentual: f64,

    pub score_geral_medio: f64,
    pub score_login_medio: f64,
    pub score_engajamento_medio: f64,
    pub score_compras_medio: f64,

    /// Members with `score_login >= 50`, in percent.
    #[serde(default)]
    pub percentual_ativos: f64,

    #[serde(default)]
    pub estatisticas: CounterStats,

    #[serde(default)]
    pub distribuicao_categorias: BTreeMap<String, f64>,

    #[serde(default)]
    pub top_3: Vec<PlayerRecord>,
}

/// Per-region statistics, normally precomputed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAnalysis {
    pub codigo: String,
    pub nome: String,
    pub quantidade: u64,

    #[serde(default)]
    pub percentual: f64,

    pub score_geral_medio: f64,
    pub score_login_medio: f64,
    pub score_engajamento_medio: f64,
    pub score_compras_medio: f64,
    pub percentual_ativos: f64,

    #[serde(default)]
    pub distribuicao_categorias: BTreeMap<String, f64>,

    #[serde(default)]
    pub top_3: Vec<PlayerRecord>,
}

/// Dashboard summary over a player subset (`resumo`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub total_jogadores: u64,
    #[serde(default)]
    pub percentual_ativos: f64,

    #[serde(default)]
    pub media_saude_login: f64,
    #[serde(default)]
    pub media_saude_engajamento: f64,
    #[serde(default)]
    pub media_saude_compras: f64,
    #[serde(default)]
    pub media_pontuacao_geral: f64,

    /// Category key -> percent of the subset.
    #[serde(default)]
    pub distribuicao_categorias: BTreeMap<String, f64>,

    #[serde(default)]
    pub top_jogadores: Vec<PlayerRecord>,
    #[serde(default)]
    pub jogadores_risco_receita: Vec<PlayerRecord>,
    #[serde(default)]
    pub jogadores_risco_engajamento: Vec<PlayerRecord>,

    #[serde(default)]
    pub estatisticas: CounterStats,

    /// Keyed by "vip_<n>"; empty tiers are absent.
    #[serde(default)]
    pub analise_vip: BTreeMap<String, VipCohort>,

    /// Keyed by region code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analise_regiao: Option<BTreeMap<String, RegionAnalysis>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regiao_atual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regiao_nome: Option<String>,

    /// Fields this crate does not interpret (benchmarks, parameters, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Summary {
    /// Precomputed analysis for a region, if the backend supplied one.
    pub fn region_analysis(&self, region: Region) -> Option<&RegionAnalysis> {
        self.analise_regiao
            .as_ref()
            .and_then(|regions| regions.get(region.code()))
    }
}
