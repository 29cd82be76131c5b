//! Player snapshot record.
//!
//! Upstream data is loosely typed: VIP level arrives under either `nivel_vip`
//! or `vip_level`, as a number or a string, and counters may be missing.
//! Everything is normalized once at deserialization time so the aggregation
//! code only ever sees a single `nivel_vip: Option<VipTier>`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::VipTier;

/// Player region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Es,
    Br,
    Int,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Es, Region::Br, Region::Int];

    /// Wire code ("es", "br", "int").
    pub fn code(&self) -> &'static str {
        match self {
            Region::Es => "es",
            Region::Br => "br",
            Region::Int => "int",
        }
    }

    /// Human-friendly name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Region::Es => "Espanhol",
            Region::Br => "Brasil",
            Region::Int => "Internacional",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "es" => Some(Region::Es),
            "br" => Some(Region::Br),
            "int" => Some(Region::Int),
            _ => None,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::from_code(s).ok_or_else(|| format!("Invalid region: {} (use es, br, int)", s))
    }
}

/// Trailing 3-day engagement counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Torneios,
    Maratonas,
    Missoes,
    Promos,
    Logins,
}

impl Counter {
    pub const ALL: [Counter; 5] = [
        Counter::Torneios,
        Counter::Maratonas,
        Counter::Missoes,
        Counter::Promos,
        Counter::Logins,
    ];

    /// Short name used in stat keys (`media_<name>_3d`).
    pub fn name(&self) -> &'static str {
        match self {
            Counter::Torneios => "torneios",
            Counter::Maratonas => "maratonas",
            Counter::Missoes => "missoes",
            Counter::Promos => "promos",
            Counter::Logins => "logins",
        }
    }

    /// Read this counter from a player.
    pub fn value(&self, player: &PlayerRecord) -> u32 {
        match self {
            Counter::Torneios => player.qtd_torneios_3d,
            Counter::Maratonas => player.qtd_maratonas_3d,
            Counter::Missoes => player.qtd_missoes_3d,
            Counter::Promos => player.qtd_promos_3d,
            Counter::Logins => player.qtd_logins_3d,
        }
    }
}

/// One row per player snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPlayerRecord")]
pub struct PlayerRecord {
    pub player_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub regiao: Option<Region>,

    /// Normalized from `nivel_vip` / `vip_level`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nivel_vip: Option<VipTier>,

    pub ativo: bool,

    pub score_login: f64,
    pub score_engajamento: f64,
    pub score_compras: f64,
    pub score_geral: f64,

    /// Category label as assigned upstream (e.g. "⭐ Elite").
    pub categoria: String,

    pub qtd_torneios_3d: u32,
    pub qtd_maratonas_3d: u32,
    pub qtd_missoes_3d: u32,
    pub qtd_promos_3d: u32,
    pub qtd_logins_3d: u32,

    /// Any other upstream columns, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlayerRecord {
    /// Create a record with zeroed scores and counters.
    pub fn new(player_id: impl Into<String>, categoria: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            regiao: None,
            nivel_vip: None,
            ativo: false,
            score_login: 0.0,
            score_engajamento: 0.0,
            score_compras: 0.0,
            score_geral: 0.0,
            categoria: categoria.into(),
            qtd_torneios_3d: 0,
            qtd_maratonas_3d: 0,
            qtd_missoes_3d: 0,
            qtd_promos_3d: 0,
            qtd_logins_3d: 0,
            extra: Map::new(),
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.regiao = Some(region);
        self
    }

    pub fn with_vip(mut self, tier: VipTier) -> Self {
        self.nivel_vip = Some(tier);
        self
    }

    pub fn with_active(mut self, ativo: bool) -> Self {
        self.ativo = ativo;
        self
    }

    /// Set all four scores (login, engajamento, compras, geral).
    pub fn with_scores(mut self, login: f64, engajamento: f64, compras: f64, geral: f64) -> Self {
        self.score_login = login;
        self.score_engajamento = engajamento;
        self.score_compras = compras;
        self.score_geral = geral;
        self
    }

    pub fn with_counter(mut self, counter: Counter, value: u32) -> Self {
        match counter {
            Counter::Torneios => self.qtd_torneios_3d = value,
            Counter::Maratonas => self.qtd_maratonas_3d = value,
            Counter::Missoes => self.qtd_missoes_3d = value,
            Counter::Promos => self.qtd_promos_3d = value,
            Counter::Logins => self.qtd_logins_3d = value,
        }
        self
    }
}

/// Wire shape of a player record before normalization.
#[derive(Debug, Deserialize)]
struct RawPlayerRecord {
    #[serde(default)]
    player_id: Option<Value>,
    #[serde(default)]
    regiao: Option<String>,
    #[serde(default)]
    nivel_vip: Option<Value>,
    #[serde(default)]
    vip_level: Option<Value>,
    #[serde(default)]
    ativo: Option<Value>,
    #[serde(default)]
    score_login: Option<f64>,
    #[serde(default)]
    score_engajamento: Option<f64>,
    #[serde(default)]
    score_compras: Option<f64>,
    #[serde(default)]
    score_geral: Option<f64>,
    #[serde(default)]
    categoria: Option<String>,
    #[serde(default)]
    qtd_torneios_3d: Option<f64>,
    #[serde(default)]
    qtd_maratonas_3d: Option<f64>,
    #[serde(default)]
    qtd_missoes_3d: Option<f64>,
    #[serde(default)]
    qtd_promos_3d: Option<f64>,
    #[serde(default)]
    qtd_logins_3d: Option<f64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn id_to_string(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn truthy(value: Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

fn counter(value: Option<f64>) -> u32 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u32,
        _ => 0,
    }
}

impl From<RawPlayerRecord> for PlayerRecord {
    fn from(raw: RawPlayerRecord) -> Self {
        // nivel_vip wins when both are present
        let nivel_vip = raw
            .nivel_vip
            .as_ref()
            .and_then(VipTier::from_json)
            .or_else(|| raw.vip_level.as_ref().and_then(VipTier::from_json));

        Self {
            player_id: id_to_string(raw.player_id),
            regiao: raw.regiao.as_deref().and_then(Region::from_code),
            nivel_vip,
            ativo: truthy(raw.ativo),
            score_login: raw.score_login.unwrap_or(0.0),
            score_engajamento: raw.score_engajamento.unwrap_or(0.0),
            score_compras: raw.score_compras.unwrap_or(0.0),
            score_geral: raw.score_geral.unwrap_or(0.0),
            categoria: raw.categoria.unwrap_or_default(),
            qtd_torneios_3d: counter(raw.qtd_torneios_3d),
            qtd_maratonas_3d: counter(raw.qtd_maratonas_3d),
            qtd_missoes_3d: counter(raw.qtd_missoes_3d),
            qtd_promos_3d: counter(raw.qtd_promos_3d),
            qtd_logins_3d: counter(raw.qtd_logins_3d),
            extra: raw.extra,
        }
    }
}
