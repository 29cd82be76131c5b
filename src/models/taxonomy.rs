//! Category taxonomy loaded from configuration.
//!
//! The set of health/risk categories has changed over time, so it is data, not
//! code: each taxonomy is a TOML table of categories carrying the upstream
//! label, the distribution key, badge class, CRM action and the legacy
//! six-bucket mapping.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CURRENT_TAXONOMY: &str = include_str!("../../taxonomies/current.toml");
const LEGACY_TAXONOMY: &str = include_str!("../../taxonomies/legacy.toml");

/// Taxonomy loading errors.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Failed to read taxonomy file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse taxonomy: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Taxonomy has no categories")]
    Empty,

    #[error("Duplicate category key: {0}")]
    DuplicateKey(String),

    #[error("Category label or alias used twice: {0}")]
    DuplicateLabel(String),

    #[error("More than one category flagged as {0:?} risk")]
    DuplicateRisk(RiskKind),

    #[error("Unknown taxonomy: {0} (use current or legacy)")]
    Unknown(String),
}

/// The six buckets of the original segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyBucket {
    Elite,
    MuitoBom,
    Estavel,
    Baixo,
    RiscoReceita,
    RiscoEngajamento,
}

impl LegacyBucket {
    pub const ALL: [LegacyBucket; 6] = [
        LegacyBucket::Elite,
        LegacyBucket::MuitoBom,
        LegacyBucket::Estavel,
        LegacyBucket::Baixo,
        LegacyBucket::RiscoReceita,
        LegacyBucket::RiscoEngajamento,
    ];

    /// Cluster name used by stored snapshots.
    pub fn label(&self) -> &'static str {
        match self {
            LegacyBucket::Elite => "Elite",
            LegacyBucket::MuitoBom => "Muito bom",
            LegacyBucket::Estavel => "Estável",
            LegacyBucket::Baixo => "Baixo",
            LegacyBucket::RiscoReceita => "Risco: Queda em Receita",
            LegacyBucket::RiscoEngajamento => "Risco: Queda em Engajamento",
        }
    }

    /// Short name used as the executive summary key.
    pub fn executive_label(&self) -> &'static str {
        match self {
            LegacyBucket::RiscoReceita => "Risco Receita",
            LegacyBucket::RiscoEngajamento => "Risco Engajamento",
            other => other.label(),
        }
    }
}

/// Which risk list a category feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    Receita,
    Engajamento,
}

/// One category of the taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Key used in `distribuicao_categorias` (e.g. "elite").
    pub key: String,

    /// Exact upstream `categoria` label (e.g. "⭐ Elite").
    pub label: String,

    /// Alternate labels that resolve to this category.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub badge_class: Option<String>,

    pub legacy_bucket: LegacyBucket,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crm_action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    name: String,
    #[serde(default = "default_badge_class")]
    default_badge_class: String,
    #[serde(default = "default_crm_action")]
    default_crm_action: String,
    categories: Vec<CategoryDef>,
}

fn default_badge_class() -> String {
    "badge-estavel".to_string()
}

fn default_crm_action() -> String {
    "📊 Acompanhamento geral".to_string()
}

/// A validated, indexed category taxonomy.
#[derive(Debug, Clone, Serialize)]
pub struct Taxonomy {
    pub name: String,
    pub default_badge_class: String,
    pub default_crm_action: String,
    pub categories: Vec<CategoryDef>,
    #[serde(skip)]
    by_label: HashMap<String, usize>,
}

impl Taxonomy {
    /// Parse and validate a taxonomy from TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile = toml::from_str(contents)?;
        Self::build(file)
    }

    /// Load a taxonomy from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, TaxonomyError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Look up one of the embedded taxonomies by name.
    pub fn builtin(name: &str) -> Result<Self, TaxonomyError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "current" => Self::from_toml_str(CURRENT_TAXONOMY),
            "legacy" => Self::from_toml_str(LEGACY_TAXONOMY),
            other => Err(TaxonomyError::Unknown(other.to_string())),
        }
    }

    /// The current 12-category taxonomy.
    pub fn current() -> Self {
        Self::from_toml_str(CURRENT_TAXONOMY).expect("embedded current taxonomy is valid")
    }

    /// The legacy 6-category taxonomy.
    pub fn legacy() -> Self {
        Self::from_toml_str(LEGACY_TAXONOMY).expect("embedded legacy taxonomy is valid")
    }

    fn build(file: TaxonomyFile) -> Result<Self, TaxonomyError> {
        if file.categories.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        let mut keys = std::collections::HashSet::new();
        let mut by_label = HashMap::new();
        let mut risks = std::collections::HashSet::new();

        for (idx, category) in file.categories.iter().enumerate() {
            if !keys.insert(category.key.clone()) {
                return Err(TaxonomyError::DuplicateKey(category.key.clone()));
            }

            for label in std::iter::once(&category.label).chain(category.aliases.iter()) {
                if by_label.insert(label.clone(), idx).is_some() {
                    return Err(TaxonomyError::DuplicateLabel(label.clone()));
                }
            }

            if let Some(risk) = category.risk {
                if !risks.insert(risk) {
                    return Err(TaxonomyError::DuplicateRisk(risk));
                }
            }
        }

        Ok(Self {
            name: file.name,
            default_badge_class: file.default_badge_class,
            default_crm_action: file.default_crm_action,
            categories: file.categories,
            by_label,
        })
    }

    /// Distribution keys in taxonomy order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.key.as_str())
    }

    /// Resolve an upstream `categoria` label (or alias).
    pub fn resolve(&self, categoria: &str) -> Option<&CategoryDef> {
        self.by_label.get(categoria).map(|&idx| &self.categories[idx])
    }

    /// Get a category by its distribution key.
    pub fn get(&self, key: &str) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// The category feeding the given risk list, if the taxonomy has one.
    pub fn risk_category(&self, kind: RiskKind) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| c.risk == Some(kind))
    }

    /// Badge CSS class for a label; unknown labels get the default badge.
    pub fn badge_class(&self, categoria: &str) -> &str {
        self.resolve(categoria)
            .and_then(|c| c.badge_class.as_deref())
            .unwrap_or(&self.default_badge_class)
    }

    /// Suggested CRM action for a label.
    pub fn crm_action(&self, categoria: &str) -> &str {
        self.resolve(categoria)
            .and_then(|c| c.crm_action.as_deref())
            .unwrap_or(&self.default_crm_action)
    }

    /// Insert 0 for any taxonomy key missing from `distribution`.
    pub fn fill_missing(&self, distribution: &mut BTreeMap<String, f64>) {
        for key in self.keys() {
            distribution.entry(key.to_string()).or_insert(0.0);
        }
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_taxonomies_load() {
        let current = Taxonomy::current();
        assert_eq!(current.name, "current");
        assert_eq!(current.categories.len(), 12);

        let legacy = Taxonomy::legacy();
        assert_eq!(legacy.name, "legacy");
        assert_eq!(legacy.categories.len(), 6);
    }

    #[test]
    fn test_builtin_by_name() {
        assert!(Taxonomy::builtin("current").is_ok());
        assert!(Taxonomy::builtin("Legacy").is_ok());
        assert!(matches!(
            Taxonomy::builtin("v3"),
            Err(TaxonomyError::Unknown(_))
        ));
    }

    #[test]
    fn test_resolve_label_and_alias() {
        let taxonomy = Taxonomy::current();

        assert_eq!(taxonomy.resolve("⭐ Elite").unwrap().key, "elite");
        assert_eq!(taxonomy.resolve("Elite").unwrap().key, "elite");
        assert_eq!(
            taxonomy.resolve("Risco: Queda em Receita").unwrap().key,
            "risco_receita"
        );
        assert!(taxonomy.resolve("Nope").is_none());
    }

    #[test]
    fn test_badge_class_lookup() {
        let taxonomy = Taxonomy::current();

        assert_eq!(taxonomy.badge_class("⭐ Elite"), "badge-elite");
        assert_eq!(taxonomy.badge_class("💰 Oportunidade VIP"), "badge-elite");
        assert_eq!(taxonomy.badge_class("💎 Churn Iminente"), "badge-risco");
        assert_eq!(taxonomy.badge_class("Unknown"), "badge-estavel");
    }

    #[test]
    fn test_crm_action_lookup() {
        let taxonomy = Taxonomy::current();

        assert_eq!(taxonomy.crm_action("🚨 Risco: Queda Receita"), "🛒 Foco em conversão");
        assert_eq!(taxonomy.crm_action("???"), "📊 Acompanhamento geral");
    }

    #[test]
    fn test_risk_categories() {
        let current = Taxonomy::current();
        assert_eq!(
            current.risk_category(RiskKind::Receita).unwrap().key,
            "risco_receita"
        );

        let legacy = Taxonomy::legacy();
        assert_eq!(
            legacy.risk_category(RiskKind::Engajamento).unwrap().label,
            "Risco: Queda em Engajamento"
        );
    }

    #[test]
    fn test_legacy_buckets_cover_current() {
        let taxonomy = Taxonomy::current();
        let bucket = |key: &str| taxonomy.get(key).unwrap().legacy_bucket;

        assert_eq!(bucket("vip_ativo"), LegacyBucket::MuitoBom);
        assert_eq!(bucket("bom"), LegacyBucket::MuitoBom);
        assert_eq!(bucket("oportunidade"), LegacyBucket::MuitoBom);
        assert_eq!(bucket("potencial"), LegacyBucket::MuitoBom);
        assert_eq!(bucket("atencao"), LegacyBucket::Baixo);
        assert_eq!(bucket("risco_alto"), LegacyBucket::Baixo);
        assert_eq!(bucket("churn_iminente"), LegacyBucket::Baixo);
        assert_eq!(bucket("elite"), LegacyBucket::Elite);
        assert_eq!(bucket("oportunidade_vip"), LegacyBucket::Elite);
    }

    #[test]
    fn test_rejects_duplicate_key() {
        let toml = r#"
            name = "dup"
            [[categories]]
            key = "a"
            label = "A"
            legacy_bucket = "elite"
            [[categories]]
            key = "a"
            label = "B"
            legacy_bucket = "baixo"
        "#;
        assert!(matches!(
            Taxonomy::from_toml_str(toml),
            Err(TaxonomyError::DuplicateKey(k)) if k == "a"
        ));
    }

    #[test]
    fn test_rejects_duplicate_label() {
        let toml = r#"
            name = "dup"
            [[categories]]
            key = "a"
            label = "A"
            legacy_bucket = "elite"
            [[categories]]
            key = "b"
            label = "B"
            aliases = ["A"]
            legacy_bucket = "baixo"
        "#;
        assert!(matches!(
            Taxonomy::from_toml_str(toml),
            Err(TaxonomyError::DuplicateLabel(_))
        ));
    }

    #[test]
    fn test_rejects_empty() {
        let toml = "name = \"empty\"\ncategories = []\n";
        assert!(matches!(
            Taxonomy::from_toml_str(toml),
            Err(TaxonomyError::Empty)
        ));
    }

    #[test]
    fn test_fill_missing() {
        let taxonomy = Taxonomy::legacy();
        let mut dist = BTreeMap::new();
        dist.insert("elite".to_string(), 40.0);

        taxonomy.fill_missing(&mut dist);

        assert_eq!(dist.len(), 6);
        assert_eq!(dist["elite"], 40.0);
        assert_eq!(dist["baixo"], 0.0);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "name = \"custom\"\n[[categories]]\nkey = \"x\"\nlabel = \"X\"\nlegacy_bucket = \"estavel\"\n",
        )
        .unwrap();

        let taxonomy = Taxonomy::from_file(&path).unwrap();
        assert_eq!(taxonomy.name, "custom");
        assert_eq!(taxonomy.badge_class("X"), "badge-estavel");
    }
}
