use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{parse_date, ExecutiveSummary, PeriodComparison, SavedSnapshot, SnapshotRecord};

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub dias: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub total: usize,
    pub historico: Vec<SnapshotRecord>,
}

/// Snapshots for the active filter, oldest first.
pub async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let dias = params.dias.unwrap_or(state.default_days);
    let historico = state.controller.history(dias).await?;
    Ok(Json(HistoryResponse {
        total: historico.len(),
        historico,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveSnapshotBody {
    /// "YYYY-MM-DD" or "DD/MM/YYYY"; the backend uses today when absent.
    #[serde(default)]
    pub data: Option<String>,
}

pub async fn save_snapshot(
    State(state): State<AppState>,
    body: Option<Json<SaveSnapshotBody>>,
) -> Result<Json<SavedSnapshot>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let date = match body.data.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => Some(
            parse_date(raw).ok_or_else(|| ApiError::BadRequest(format!("Invalid date: {}", raw)))?,
        ),
        None => None,
    };

    let saved = state.controller.save_snapshot(date).await?;
    Ok(Json(saved))
}

pub async fn executive(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ExecutiveSummary>, ApiError> {
    let dias = params.dias.unwrap_or(state.default_days);
    Ok(Json(state.controller.executive(dias).await?))
}

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub inicio: String,
    pub fim: String,
}

fn required_date(name: &str, raw: &str) -> Result<chrono::NaiveDate, ApiError> {
    parse_date(raw).ok_or_else(|| ApiError::BadRequest(format!("Invalid {}: {}", name, raw)))
}

/// Averages and first-to-last change between two dates.
pub async fn compare(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> Result<Json<PeriodComparison>, ApiError> {
    let inicio = required_date("inicio", &params.inicio)?;
    let fim = required_date("fim", &params.fim)?;
    if inicio > fim {
        return Err(ApiError::BadRequest(format!(
            "inicio ({}) is after fim ({})",
            inicio, fim
        )));
    }

    Ok(Json(state.controller.compare_periods(inicio, fim).await?))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: i64,
}

pub async fn delete_snapshot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.controller.delete_snapshot(id).await?;
    Ok(Json(DeleteResponse { deleted: id }))
}

#[derive(Debug, Serialize)]
pub struct DeleteDateResponse {
    pub deleted_date: String,
}

/// Delete every snapshot of one day.
pub async fn delete_snapshots_on(
    State(state): State<AppState>,
    Path(data): Path<String>,
) -> Result<Json<DeleteDateResponse>, ApiError> {
    let date = required_date("date", &data)?;
    state.controller.delete_snapshots_on(date).await?;
    Ok(Json(DeleteDateResponse {
        deleted_date: date.format("%Y-%m-%d").to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::api::build_router;
    use crate::api::state::AppState;
    use crate::client::mock::MockHealthApi;
    use crate::dashboard::DashboardController;
    use crate::models::{SnapshotRecord, Taxonomy};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn snapshot(id: i64, data: &str, total: u64, elite: u64) -> SnapshotRecord {
        serde_json::from_value(json!({
            "id": id,
            "data": data,
            "data_timestamp": format!("{}T09:00:00", data),
            "total_jogadores": total,
            "percentual_ativos": 40.0,
            "media_score_geral": 55.5,
            "clusters": { "Elite": elite },
        }))
        .unwrap()
    }

    fn setup_app(api: Arc<MockHealthApi>) -> axum::Router {
        let controller = DashboardController::new(
            api,
            Arc::new(Taxonomy::current()),
            Duration::from_secs(600),
            4,
        );
        build_router(AppState::new(controller, 30))
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn test_history_is_ascending() {
        let api = Arc::new(MockHealthApi::new().with_snapshots(vec![
            snapshot(2, "2025-02-02", 120, 12),
            snapshot(1, "2025-02-01", 100, 10),
            snapshot(3, "2025-02-03", 130, 13),
        ]));
        let (status, json) = get_json(setup_app(api), "/api/dashboard/history?dias=30").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 3);
        let dates: Vec<&str> = json["historico"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["data"].as_str().unwrap())
            .collect();
        assert_eq!(dates, vec!["2025-02-01", "2025-02-02", "2025-02-03"]);
    }

    #[tokio::test]
    async fn test_history_respects_dias() {
        let api = Arc::new(MockHealthApi::new().with_snapshots(vec![
            snapshot(1, "2025-02-01", 100, 10),
            snapshot(2, "2025-02-02", 120, 12),
            snapshot(3, "2025-02-03", 130, 13),
        ]));
        let (_, json) = get_json(setup_app(api), "/api/dashboard/history?dias=2").await;

        assert_eq!(json["total"], 2);
        assert_eq!(json["historico"][0]["data"], "2025-02-02");
    }

    #[tokio::test]
    async fn test_executive_endpoint() {
        let api = Arc::new(MockHealthApi::new().with_snapshots(vec![
            snapshot(1, "2025-02-01", 100, 10),
            snapshot(2, "2025-02-02", 120, 12),
        ]));
        let (status, json) = get_json(setup_app(api), "/api/dashboard/history/executive").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data_referencia"], "2025-02-02");
        assert_eq!(json["variacoes_dia"]["total_jogadores"], 20);
        assert_eq!(json["distribuicao_clusters"]["Elite"]["qtd"], 12);
        assert_eq!(json["distribuicao_clusters"]["Elite"]["pct"], 10.0);
        assert_eq!(json["evolucao"][0]["data"], "2025-02-02");
    }

    #[tokio::test]
    async fn test_executive_without_snapshots() {
        let (status, json) = get_json(
            setup_app(Arc::new(MockHealthApi::new())),
            "/api/dashboard/history/executive",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_save_snapshot_with_date() {
        let api = Arc::new(MockHealthApi::new());
        let (status, json) = send(
            setup_app(api.clone()),
            Request::builder()
                .method("POST")
                .uri("/api/dashboard/history")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"data":"15/03/2025"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], "2025-03-15");
        assert_eq!(api.saved_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_save_snapshot_without_body() {
        let api = Arc::new(MockHealthApi::new());
        let (status, _) = send(
            setup_app(api.clone()),
            Request::builder()
                .method("POST")
                .uri("/api/dashboard/history")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(api.saved_requests()[0].data, None);
    }

    #[tokio::test]
    async fn test_save_snapshot_bad_date() {
        let api = Arc::new(MockHealthApi::new());
        let (status, _) = send(
            setup_app(api.clone()),
            Request::builder()
                .method("POST")
                .uri("/api/dashboard/history")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"data":"yesterday"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(api.saved_requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_snapshot() {
        let api = Arc::new(MockHealthApi::new().with_snapshots(vec![snapshot(5, "2025-02-01", 1, 0)]));
        let app = setup_app(api.clone());

        let delete = |uri: &'static str| {
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        };

        let (status, json) = send(app.clone(), delete("/api/dashboard/history/5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["deleted"], 5);
        assert!(api.snapshot_ids().is_empty());

        let (status, _) = send(app, delete("/api/dashboard/history/5")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_compare_endpoint() {
        let api = Arc::new(MockHealthApi::new().with_snapshots(vec![
            snapshot(1, "2025-02-01", 100, 10),
            snapshot(2, "2025-02-02", 120, 12),
            snapshot(3, "2025-02-10", 300, 30),
        ]));
        let (status, json) = get_json(
            setup_app(api),
            "/api/dashboard/history/compare?inicio=2025-02-01&fim=02/02/2025",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["periodo"]["inicio"], "2025-02-01");
        assert_eq!(json["periodo"]["dias"], 2);
        assert_eq!(json["medias"]["total_jogadores"], 110.0);
        assert_eq!(json["tendencia"]["total_jogadores"], 20);
        assert_eq!(json["evolucao_diaria"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_compare_rejects_bad_ranges() {
        let app = setup_app(Arc::new(MockHealthApi::new()));

        let (status, _) = get_json(
            app.clone(),
            "/api/dashboard/history/compare?inicio=2025-02-10&fim=2025-02-01",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            get_json(app.clone(), "/api/dashboard/history/compare?inicio=soon&fim=2025-02-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = get_json(
            app,
            "/api/dashboard/history/compare?inicio=2025-02-01&fim=2025-02-10",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_snapshots_by_date() {
        let api = Arc::new(MockHealthApi::new().with_snapshots(vec![
            snapshot(1, "2025-02-01", 1, 0),
            snapshot(2, "2025-02-02", 1, 0),
        ]));
        let app = setup_app(api.clone());

        let delete = |uri: &'static str| {
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        };

        let (status, json) = send(app.clone(), delete("/api/dashboard/history/date/2025-02-02")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["deleted_date"], "2025-02-02");
        assert_eq!(api.snapshot_ids(), vec![1]);

        let (status, _) = send(app.clone(), delete("/api/dashboard/history/date/2025-02-02")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app, delete("/api/dashboard/history/date/tomorrow")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
