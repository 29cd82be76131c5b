//! reqwest implementation of `HealthApi`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::{decode_envelope, ClientError, ExportFormat, HealthApi, UploadFile};
use crate::models::{
    Dataset, HistoryQuery, LatestPlayers, LoadOutcome, PlayerTrend, SavedSnapshot, SnapshotRecord,
    SnapshotRequest,
};

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    historico: Vec<SnapshotRecord>,
}

#[derive(Debug, Deserialize)]
struct TrendEnvelope {
    evolucao: PlayerTrend,
}

/// HTTP client for the scoring backend.
pub struct HttpHealthApi {
    client: Client,
    base_url: Url,
}

impl HttpHealthApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("health-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Turn a non-2xx response into `HttpStatus`, using the backend's
    /// `detail` / `message` field when the body is JSON.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("detail")
                    .or_else(|| v.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);

        Err(ClientError::HttpStatus {
            status: status.as_u16(),
            message,
        })
    }

    async fn json(response: Response) -> Result<Value, ClientError> {
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl HealthApi for HttpHealthApi {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_dataset(&self) -> Result<Dataset, ClientError> {
        let url = self.endpoint("api/dados")?;
        debug!("Fetching dataset from {}", url);

        let value = Self::json(self.client.get(url).send().await?).await?;
        let dataset: Dataset = decode_envelope(value)?;

        info!("Fetched {} players", dataset.dados_completos.len());
        Ok(dataset)
    }

    async fn upload(&self, file: UploadFile) -> Result<LoadOutcome, ClientError> {
        let url = self.endpoint("api/upload")?;
        let name = file.name().to_string();
        info!("Uploading {} ({} bytes)", name, file.len());

        let part = Part::bytes(file.into_contents()).file_name(name);
        let form = Form::new().part("file", part);

        let value = Self::json(self.client.post(url).multipart(form).send().await?).await?;
        decode_envelope(value)
    }

    async fn load_sample(&self) -> Result<LoadOutcome, ClientError> {
        let url = self.endpoint("api/sample")?;
        let value = Self::json(self.client.get(url).send().await?).await?;
        decode_envelope(value)
    }

    async fn history(&self, query: &HistoryQuery) -> Result<Vec<SnapshotRecord>, ClientError> {
        let url = self.endpoint("api/historico")?;
        let params = [
            ("regiao", query.filtros.regiao.to_string()),
            ("vip", query.filtros.vip.to_string()),
            ("dias", query.dias.to_string()),
        ];

        let value = Self::json(self.client.get(url).query(&params).send().await?).await?;
        let envelope: HistoryEnvelope = decode_envelope(value)?;

        debug!("Fetched {} snapshots", envelope.historico.len());
        Ok(envelope.historico)
    }

    async fn save_snapshot(&self, request: &SnapshotRequest) -> Result<SavedSnapshot, ClientError> {
        let url = self.endpoint("api/historico/salvar")?;
        let value = Self::json(self.client.post(url).json(request).send().await?).await?;
        let saved: SavedSnapshot = decode_envelope(value)?;

        info!("Saved snapshot for {}", saved.data);
        Ok(saved)
    }

    async fn delete_snapshot(&self, id: i64) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("api/historico/{}", id))?;
        let value = Self::json(self.client.delete(url).send().await?).await?;
        decode_envelope::<Value>(value)?;

        info!("Deleted snapshot {}", id);
        Ok(())
    }

    async fn delete_snapshots_on(&self, date: NaiveDate) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("api/historico/data/{}", date.format("%Y-%m-%d")))?;
        let value = Self::json(self.client.delete(url).send().await?).await?;
        decode_envelope::<Value>(value)?;

        info!("Deleted snapshots of {}", date);
        Ok(())
    }

    async fn player_trend(&self, player_id: &str, days: u32) -> Result<PlayerTrend, ClientError> {
        // Player ids are pushed as a segment so '/' and '?' get escaped
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "player", player_id, "evolucao"]);

        let value = Self::json(
            self.client
                .get(url)
                .query(&[("dias", days)])
                .send()
                .await?,
        )
        .await?;
        let envelope: TrendEnvelope = decode_envelope(value)?;
        Ok(envelope.evolucao)
    }

    async fn latest_players(&self, days: u32) -> Result<LatestPlayers, ClientError> {
        let url = self.endpoint("api/players/ultimos")?;
        let value = Self::json(self.client.get(url).query(&[("dias", days)]).send().await?).await?;
        decode_envelope(value)
    }

    async fn export(&self, format: ExportFormat) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint(&format!("api/export/{}", format.path()))?;
        let response = Self::check(self.client.get(url).send().await?).await?;
        let bytes = response.bytes().await?;

        debug!("Exported {} bytes as {}", bytes.len(), format);
        Ok(bytes.to_vec())
    }
}
