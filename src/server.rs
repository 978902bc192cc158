//! HTTP surface of the gateway.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?q=&filterUnresolved=&sortOrder=` | Ticket search |
//! | `GET`  | `/ready` | Whether the indexer has finished ingesting |
//! | `POST` | `/update-status` | Forward `{email, status}` to the indexer |
//! | `GET`  | `/health` | Gateway liveness (returns version) |
//!
//! # Error Contract
//!
//! `/search` and `/ready` always answer 200; failures are carried in the
//! body (`{results: [], error, query}` and `{ready: false}`).
//! `/update-status` answers 400 `{error}` when a field is missing and
//! 502 `{error: "Failed to update status"}` when the indexer call fails.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser front-end
//! can be served from a different origin.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::GatewayError;
use crate::gateway::{Gateway, SearchParams, STATUS_FIELDS_REQUIRED};
use crate::models::{ReadyResponse, SearchResponse, SortOrder, UpdateStatusRequest};

#[derive(Clone)]
struct AppState {
    gateway: Arc<Gateway>,
}

/// Starts the gateway on `[server].bind` and serves until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let gateway = Arc::new(Gateway::from_config(config)?);
    let app = build_router(gateway);

    tracing::info!(
        bind = %config.server.bind,
        engine = %config.engine.node_url(),
        index = %config.engine.index,
        indexer = %config.indexer.url,
        "search gateway listening"
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Router with all routes, CORS and request tracing.
pub fn build_router(gateway: Arc<Gateway>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(handle_search))
        .route("/ready", get(handle_ready))
        .route("/update-status", post(handle_update_status))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { gateway })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn bad_gateway(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        message: message.into(),
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(msg) => bad_request(msg),
            GatewayError::DownstreamUnavailable(msg) | GatewayError::Malformed(msg) => {
                bad_gateway(msg)
            }
        }
    }
}

// ============ GET /search ============

#[derive(Debug, Default, PartialEq)]
struct SearchQuery {
    q: Option<String>,
    filter_unresolved: Option<String>,
    sort_order: Option<String>,
}

impl SearchQuery {
    /// Collect the recognised parameters. A repeated key keeps its first
    /// value; unknown keys are ignored.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = SearchQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut query.q,
                "filterUnresolved" => &mut query.filter_unresolved,
                "sortOrder" => &mut query.sort_order,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

/// Handler for `GET /search`. Only the literal `"true"` enables the
/// unresolved-only filter.
async fn handle_search(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<SearchResponse> {
    let params = SearchQuery::from_pairs(pairs);
    let search_params = SearchParams {
        filter_unresolved: params.filter_unresolved.as_deref() == Some("true"),
        sort_order: SortOrder::from_param(params.sort_order.as_deref()),
    };
    Json(
        state
            .gateway
            .search(params.q.as_deref(), search_params)
            .await,
    )
}

// ============ GET /ready ============

async fn handle_ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        ready: state.gateway.ready().await,
    })
}

// ============ POST /update-status ============

/// Handler for `POST /update-status`.
///
/// An unreadable body is reported the same way as missing fields.
async fn handle_update_status(
    State(state): State<AppState>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(req) = body.map_err(|_| bad_request(STATUS_FIELDS_REQUIRED))?;
    let result = state
        .gateway
        .update_status(req.email.as_deref(), req.status.as_deref())
        .await?;
    Ok(Json(result))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    engine_reachable: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine_reachable: state.gateway.engine_reachable().await,
    })
}
