use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{ApiError, Pagination, PaginationMeta};
use crate::client::{TrendBatch, MAX_BATCH_IDS};
use crate::models::{LatestPlayers, PlayerRecord};

#[derive(Debug, Deserialize)]
pub struct PlayersParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Taxonomy key or category label.
    pub categoria: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    pub jogadores: Vec<PlayerRecord>,
    pub pagination: PaginationMeta,
}

/// Page through the players matching the active filter.
pub async fn list_players(
    State(state): State<AppState>,
    Query(params): Query<PlayersParams>,
) -> Result<Json<PlayersResponse>, ApiError> {
    let pagination = Pagination::new(params.page, params.page_size);
    let players = state.controller.players().await;
    let taxonomy = state.controller.taxonomy().await;

    let wanted = match params.categoria.as_deref() {
        Some(raw) => Some(
            taxonomy
                .get(raw)
                .or_else(|| taxonomy.resolve(raw))
                .map(|def| def.key.clone())
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown category: {}", raw)))?,
        ),
        None => None,
    };

    let matching: Vec<&PlayerRecord> = players
        .iter()
        .filter(|p| match &wanted {
            Some(key) => taxonomy.resolve(&p.categoria).is_some_and(|def| &def.key == key),
            None => true,
        })
        .collect();

    let total = matching.len() as u32;
    let jogadores = matching
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.page_size as usize)
        .cloned()
        .collect();

    Ok(Json(PlayersResponse {
        jogadores,
        pagination: PaginationMeta::new(&pagination, total),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DaysParams {
    pub dias: Option<u32>,
}

/// Most recent record per player across history.
pub async fn latest_players(
    State(state): State<AppState>,
    Query(params): Query<DaysParams>,
) -> Result<Json<LatestPlayers>, ApiError> {
    let dias = params.dias.unwrap_or(state.default_days);
    Ok(Json(state.controller.latest_players(dias).await?))
}

#[derive(Debug, Deserialize)]
pub struct TrendsParams {
    /// Comma-separated player ids.
    pub ids: String,
    pub dias: Option<u32>,
}

/// Batched trend lookup for a table of players.
pub async fn trends(
    State(state): State<AppState>,
    Query(params): Query<TrendsParams>,
) -> Result<Json<TrendBatch>, ApiError> {
    let ids: Vec<String> = params
        .ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(ApiError::BadRequest("ids must name at least one player".to_string()));
    }
    if ids.len() > MAX_BATCH_IDS {
        return Err(ApiError::BadRequest(format!(
            "at most {} ids per request, got {}",
            MAX_BATCH_IDS,
            ids.len()
        )));
    }

    let dias = params.dias.unwrap_or(state.default_days);
    Ok(Json(state.controller.player_trends(&ids, dias).await))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub invalidated: String,
}

/// Drop a player's cached trends so the next lookup hits the backend.
pub async fn refresh_trend(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Json<RefreshResponse> {
    state.controller.refresh_trend(&player_id).await;
    Json(RefreshResponse {
        invalidated: player_id,
    })
}
