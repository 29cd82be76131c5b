use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::{round2, CategoryCluster, RISK_LIST_LIMIT};
use crate::client::{ExportFormat, UploadFile};
use crate::models::{Counter, FilterSelection, LegacyBucket, Summary, Taxonomy};

pub async fn summary(State(state): State<AppState>) -> Json<Summary> {
    Json(state.controller.summary().await.as_ref().clone())
}

pub async fn get_filters(State(state): State<AppState>) -> Json<FilterSelection> {
    Json(state.controller.filter().await)
}

/// Change the region/VIP filter and return the recomputed summary.
pub async fn set_filters(
    State(state): State<AppState>,
    Json(filter): Json<FilterSelection>,
) -> Json<Summary> {
    let summary = state.controller.apply_filter(filter).await;
    Json(summary.as_ref().clone())
}

pub async fn reload(State(state): State<AppState>) -> Result<Json<Summary>, ApiError> {
    let summary = state.controller.reload().await?;
    Ok(Json(summary.as_ref().clone()))
}

pub async fn load_sample(State(state): State<AppState>) -> Result<Json<Summary>, ApiError> {
    let summary = state.controller.load_sample().await?;
    Ok(Json(summary.as_ref().clone()))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

/// Raw spreadsheet body; the file name comes from `?filename=`.
pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<Summary>, ApiError> {
    let filename = params
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("filename query parameter is required".to_string()))?;

    if body.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is empty", filename)));
    }

    let file = UploadFile::new(filename, body.to_vec())?;
    let summary = state.controller.upload(file).await?;
    Ok(Json(summary.as_ref().clone()))
}

#[derive(Debug, Deserialize)]
pub struct ClustersParams {
    pub limit: Option<usize>,
}

pub async fn clusters(
    State(state): State<AppState>,
    Query(params): Query<ClustersParams>,
) -> Json<Vec<CategoryCluster>> {
    let limit = params.limit.unwrap_or(RISK_LIST_LIMIT);
    let clusters = state.controller.state().read().await.clusters(limit);
    Json(clusters)
}

#[derive(Debug, Serialize)]
pub struct LegacyCategory {
    pub bucket: LegacyBucket,
    pub label: &'static str,
    pub percentual: f64,
}

/// Filtered players on the six-bucket segmentation.
pub async fn legacy_categories(State(state): State<AppState>) -> Json<Vec<LegacyCategory>> {
    let distribution = state.controller.state().read().await.legacy_distribution();
    let categories = LegacyBucket::ALL
        .iter()
        .map(|bucket| LegacyCategory {
            bucket: *bucket,
            label: bucket.label(),
            percentual: distribution.get(bucket).copied().unwrap_or(0.0),
        })
        .collect();
    Json(categories)
}

#[derive(Debug, Serialize)]
pub struct CounterBenchmark {
    pub contador: &'static str,
    pub media_3d: f64,
    pub mediana_3d: f64,
    pub por_dia: f64,
}

/// Daily benchmarks for every counter of the filtered summary.
pub async fn benchmarks(State(state): State<AppState>) -> Json<Vec<CounterBenchmark>> {
    let summary = state.controller.summary().await;
    let stats = &summary.estatisticas;
    let benchmarks = Counter::ALL
        .iter()
        .map(|counter| {
            let values = stats.get(*counter);
            CounterBenchmark {
                contador: counter.name(),
                media_3d: values.mean,
                mediana_3d: values.median,
                por_dia: round2(stats.per_day(*counter)),
            }
        })
        .collect();
    Json(benchmarks)
}

pub async fn taxonomy(State(state): State<AppState>) -> Json<Taxonomy> {
    Json(state.controller.taxonomy().await.as_ref().clone())
}

/// Processed data as a download, passed through from the backend.
pub async fn export(
    State(state): State<AppState>,
    Path(format): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let format: ExportFormat = format.parse().map_err(ApiError::BadRequest)?;
    let bytes = state.controller.export(format).await?;
    info!("Exported {} bytes as {}", bytes.len(), format);

    let disposition = format!("attachment; filename=\"{}\"", format.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
