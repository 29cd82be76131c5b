//! REST API endpoints.
//!
//! Axum-based HTTP API exposing the dashboard summary, the filtered player
//! table, snapshot history and player trends to the rendering frontend.

pub mod routes {
    pub mod dashboard;
    pub mod history;
    pub mod players;
}
pub mod state;

use std::path::Path;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::client::ClientError;
use crate::dashboard::DashboardError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend error: {0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Superseded => ApiError::Conflict(err.to_string()),
            DashboardError::NoHistory => ApiError::NotFound(err.to_string()),
            DashboardError::Client(client) => match client {
                ClientError::HttpStatus { status: 404, message } => ApiError::NotFound(message),
                ClientError::UnsupportedFile(_) => ApiError::BadRequest(client.to_string()),
                ClientError::InvalidUrl(_) => ApiError::Internal(client.to_string()),
                ClientError::Http(_)
                | ClientError::HttpStatus { .. }
                | ClientError::Rejected(_)
                | ClientError::Json(_) => ApiError::BadGateway(client.to_string()),
            },
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        DashboardError::from(err).into()
    }
}

/// Pagination parameters.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 50,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(50).clamp(1, 500),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.page_size
    }
}

/// Pagination metadata in responses.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u32) -> Self {
        let total_pages = total_items.div_ceil(pagination.page_size);
        Self {
            page: pagination.page,
            page_size: pagination.page_size,
            total_items,
            total_pages,
            has_next: pagination.page < total_pages,
            has_prev: pagination.page > 1,
        }
    }
}

/// All dashboard routes, with request tracing.
pub fn build_router(state: AppState) -> Router {
    use routes::{dashboard, history, players};

    Router::new()
        .route("/api/dashboard/summary", get(dashboard::summary))
        .route(
            "/api/dashboard/filters",
            get(dashboard::get_filters).put(dashboard::set_filters),
        )
        .route("/api/dashboard/reload", post(dashboard::reload))
        .route("/api/dashboard/sample", post(dashboard::load_sample))
        .route("/api/dashboard/upload", post(dashboard::upload))
        .route("/api/dashboard/clusters", get(dashboard::clusters))
        .route("/api/dashboard/categories/legacy", get(dashboard::legacy_categories))
        .route("/api/dashboard/benchmarks", get(dashboard::benchmarks))
        .route("/api/dashboard/taxonomy", get(dashboard::taxonomy))
        .route("/api/dashboard/export/:format", get(dashboard::export))
        .route(
            "/api/dashboard/history",
            get(history::list_history).post(history::save_snapshot),
        )
        .route("/api/dashboard/history/executive", get(history::executive))
        .route("/api/dashboard/history/compare", get(history::compare))
        .route(
            "/api/dashboard/history/date/:data",
            delete(history::delete_snapshots_on),
        )
        .route("/api/dashboard/history/:id", delete(history::delete_snapshot))
        .route("/api/dashboard/players", get(players::list_players))
        .route("/api/dashboard/players/latest", get(players::latest_players))
        .route("/api/dashboard/trends", get(players::trends))
        .route("/api/dashboard/trends/:player_id", delete(players::refresh_trend))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router for the `serve` command: CORS for `cors_origin` and, when given,
/// the frontend's static files for every non-API path.
pub fn build_app(state: AppState, cors_origin: &str, static_dir: Option<&Path>) -> Router {
    let cors = if cors_origin == "*" {
        CorsLayer::permissive()
    } else {
        match cors_origin.parse::<HeaderValue>() {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
            Err(_) => {
                warn!("Invalid CORS origin {:?}, allowing any origin", cors_origin);
                CorsLayer::permissive()
            }
        }
    };

    let router = build_router(state);
    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(cors)
}
