//! Backend API client.
//!
//! The scoring backend owns uploads, persistence and per-player history. This
//! module wraps it behind the `HealthApi` trait so the dashboard can be driven
//! by the real HTTP client or by an in-memory double.

mod http;
#[cfg(test)]
pub mod mock;
mod trend_cache;

pub use http::HttpHealthApi;
pub use trend_cache::{TrendBatch, TrendCache, MAX_BATCH_IDS};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    Dataset, HistoryQuery, LatestPlayers, LoadOutcome, PlayerTrend, SavedSnapshot, SnapshotRecord,
    SnapshotRequest,
};

/// Errors that can occur talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Backend rejected request: {0}")]
    Rejected(String),

    #[error("Unsupported file {0}: use .csv, .xlsx or .xls")]
    UnsupportedFile(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Spreadsheet flavour of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Csv,
    Excel,
}

impl UploadKind {
    /// Detect from the file extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = std::path::Path::new(name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Some(UploadKind::Csv),
            "xlsx" | "xls" => Some(UploadKind::Excel),
            _ => None,
        }
    }
}

/// A player spreadsheet that passed the extension check.
///
/// The only way to build one is `UploadFile::new`, so nothing with an
/// unsupported extension ever reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    kind: UploadKind,
    contents: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, contents: Vec<u8>) -> Result<Self, ClientError> {
        let name = name.into();
        let kind =
            UploadKind::from_file_name(&name).ok_or_else(|| ClientError::UnsupportedFile(name.clone()))?;

        Ok(Self {
            name,
            kind,
            contents,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UploadKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn into_contents(self) -> Vec<u8> {
        self.contents
    }
}

/// Processed-data export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    /// Backend path segment.
    pub fn path(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "health_score_resultado.csv",
            ExportFormat::Excel => "health_score_resultado.xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            _ => Err(format!("Unknown export format: {} (use csv or excel)", s)),
        }
    }
}

/// The scoring backend.
#[async_trait]
pub trait HealthApi: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Full processed dataset (`GET /api/dados`).
    async fn fetch_dataset(&self) -> Result<Dataset, ClientError>;

    /// Upload a player spreadsheet for scoring.
    async fn upload(&self, file: UploadFile) -> Result<LoadOutcome, ClientError>;

    /// Generate and load the sample dataset.
    async fn load_sample(&self) -> Result<LoadOutcome, ClientError>;

    /// Stored snapshots, in whatever order the backend returns them.
    async fn history(&self, query: &HistoryQuery) -> Result<Vec<SnapshotRecord>, ClientError>;

    async fn save_snapshot(&self, request: &SnapshotRequest) -> Result<SavedSnapshot, ClientError>;

    async fn delete_snapshot(&self, id: i64) -> Result<(), ClientError>;

    /// Delete every snapshot stored for a date.
    async fn delete_snapshots_on(&self, date: NaiveDate) -> Result<(), ClientError>;

    /// Score history of one player over the last `days` days.
    async fn player_trend(&self, player_id: &str, days: u32) -> Result<PlayerTrend, ClientError>;

    /// Most recent record per player across history.
    async fn latest_players(&self, days: u32) -> Result<LatestPlayers, ClientError>;

    /// Processed data as a file blob.
    async fn export(&self, format: ExportFormat) -> Result<Vec<u8>, ClientError>;
}

/// Check the `success` flag of a backend envelope, then decode it.
///
/// Envelopes without a `success` field are decoded as-is.
pub(crate) fn decode_envelope<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("message")
            .or_else(|| value.get("detail"))
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string();
        return Err(ClientError::Rejected(message));
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upload_kind_detection() {
        assert_eq!(UploadKind::from_file_name("players.csv"), Some(UploadKind::Csv));
        assert_eq!(UploadKind::from_file_name("PLAYERS.XLSX"), Some(UploadKind::Excel));
        assert_eq!(UploadKind::from_file_name("old.xls"), Some(UploadKind::Excel));
        assert_eq!(UploadKind::from_file_name("notes.txt"), None);
        assert_eq!(UploadKind::from_file_name("csv"), None);
        assert_eq!(UploadKind::from_file_name(""), None);
    }

    #[test]
    fn test_upload_file_rejects_bad_extension() {
        let err = UploadFile::new("dump.json", b"{}".to_vec()).unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedFile(name) if name == "dump.json"));

        let file = UploadFile::new("day1.csv", b"player_id\n1\n".to_vec()).unwrap();
        assert_eq!(file.kind(), UploadKind::Csv);
        assert_eq!(file.len(), 12);
    }

    #[test]
    fn test_export_format() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Excel.file_name(), "health_score_resultado.xlsx");
        assert_eq!(ExportFormat::Excel.path(), "excel");
    }

    #[test]
    fn test_decode_envelope() {
        #[derive(Debug, Deserialize)]
        struct Saved {
            data: String,
        }

        let ok: Saved = decode_envelope(json!({"success": true, "data": "2025-01-01"})).unwrap();
        assert_eq!(ok.data, "2025-01-01");

        let bare: Saved = decode_envelope(json!({"data": "x"})).unwrap();
        assert_eq!(bare.data, "x");

        let err = decode_envelope::<Saved>(json!({"success": false, "message": "Nenhum histórico"}))
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(m) if m == "Nenhum histórico"));
    }
}
