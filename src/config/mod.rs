//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::models::{Taxonomy, TaxonomyError};
use crate::parse_duration;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
}

/// Scoring backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the scoring backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Frontend assets served for non-API paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            static_dir: None,
        }
    }
}

/// Dashboard behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Built-in taxonomy: "current" or "legacy"
    #[serde(default = "default_taxonomy")]
    pub taxonomy: String,

    /// Custom taxonomy file, overrides `taxonomy`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy_path: Option<PathBuf>,

    /// How long a fetched player trend stays fresh ("10m", "90s", "1h")
    #[serde(default = "default_trend_cache_ttl")]
    pub trend_cache_ttl: String,

    /// Max trend lookups in flight per batch
    #[serde(default = "default_trend_concurrency")]
    pub trend_concurrency: usize,

    /// Default history / trend window in days
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,
}

fn default_taxonomy() -> String {
    "current".to_string()
}

fn default_trend_cache_ttl() -> String {
    "10m".to_string()
}

fn default_trend_concurrency() -> usize {
    8
}

fn default_trend_days() -> u32 {
    30
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            taxonomy: default_taxonomy(),
            taxonomy_path: None,
            trend_cache_ttl: default_trend_cache_ttl(),
            trend_concurrency: default_trend_concurrency(),
            trend_days: default_trend_days(),
        }
    }
}

impl DashboardConfig {
    /// Parsed `trend_cache_ttl`.
    pub fn trend_ttl(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.trend_cache_ttl).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Invalid trend_cache_ttl: {:?} (use e.g. \"10m\")",
                self.trend_cache_ttl
            ))
        })
    }

    /// The configured taxonomy: a custom file when set, else a built-in.
    pub fn load_taxonomy(&self) -> Result<Taxonomy, ConfigError> {
        let taxonomy = match &self.taxonomy_path {
            Some(path) => Taxonomy::from_file(path)?,
            None => Taxonomy::builtin(&self.taxonomy)?,
        };
        info!(
            "Using taxonomy {:?} ({} categories)",
            taxonomy.name,
            taxonomy.categories.len()
        );
        Ok(taxonomy)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            backend: BackendConfig::default(),
            server: ServerConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or use defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            let config = AppConfig::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Backend timeout must be greater than 0".to_string(),
            ));
        }

        if url::Url::parse(&self.backend.base_url).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Backend base_url is not a valid URL: {}",
                self.backend.base_url
            )));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.dashboard.trend_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "Trend concurrency must be greater than 0".to_string(),
            ));
        }

        self.dashboard.trend_ttl()?;

        Ok(())
    }
}
