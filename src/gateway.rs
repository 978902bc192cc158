//! Search gateway: the stateless request logic behind the HTTP surface.
//!
//! Each call is independent. The only thing held across calls is the pair of
//! downstream handles, which are safe to share between concurrent requests.
//! Every downstream failure degrades to a safe default here, so the HTTP
//! layer never has to deal with a fault from search or readiness.

use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::{ElasticsearchEngine, SearchEngine};
use crate::error::{GatewayError, GatewayResult};
use crate::indexer::{HttpStatusService, StatusService};
use crate::models::{SearchRequest, SearchResponse};
use crate::query::{build_query, PAGE_SIZE};
use crate::shape::shape_body;

pub const QUERY_REQUIRED: &str = "Query parameter is required";
pub const SEARCH_FAILED: &str = "Search failed";
pub const STATUS_FIELDS_REQUIRED: &str = "Email and status are required";
pub const UPDATE_FAILED: &str = "Failed to update status";

/// Sentinel clients send when the user leaves the search box blank.
pub const MATCH_ALL: &str = "*";

pub struct Gateway {
    engine: Arc<dyn SearchEngine>,
    indexer: Arc<dyn StatusService>,
    page_size: usize,
}

impl Gateway {
    pub fn new(engine: Arc<dyn SearchEngine>, indexer: Arc<dyn StatusService>) -> Self {
        Self {
            engine,
            indexer,
            page_size: PAGE_SIZE,
        }
    }

    /// Gateway wired to the HTTP engine and indexer from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let engine = ElasticsearchEngine::new(&config.engine)?;
        let indexer = HttpStatusService::new(&config.indexer)?;
        tracing::info!(
            engine = engine.search_url(),
            indexer = %config.indexer.url,
            "downstream services configured"
        );
        Ok(Self::new(Arc::new(engine), Arc::new(indexer)).with_page_size(config.engine.page_size))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Search tickets.
    ///
    /// A missing or empty query short-circuits with a validation error and
    /// never reaches the engine. Any engine failure yields empty results
    /// with the query echoed back.
    pub async fn search(&self, query: Option<&str>, request: SearchParams) -> SearchResponse {
        let text = match query {
            Some(q) if !q.is_empty() => q,
            _ => {
                return SearchResponse::Failed {
                    results: Vec::new(),
                    error: QUERY_REQUIRED.to_string(),
                    query: None,
                }
            }
        };

        let req = SearchRequest {
            query: text.to_string(),
            filter_unresolved: request.filter_unresolved,
            sort_order: request.sort_order,
        };

        match self.run_search(&req).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(
                    query = %req.query,
                    kind = e.kind(),
                    error = %e,
                    "search failed, returning empty results"
                );
                SearchResponse::Failed {
                    results: Vec::new(),
                    error: SEARCH_FAILED.to_string(),
                    query: Some(req.query),
                }
            }
        }
    }

    async fn run_search(&self, req: &SearchRequest) -> GatewayResult<SearchResponse> {
        let engine_query = build_query(&req.query, req.filter_unresolved, req.sort_order)
            .with_size(self.page_size);
        tracing::debug!(body = %engine_query.to_json(), "engine query");

        let body = self.engine.search(&engine_query).await?;
        let shaped = shape_body(body)?;

        tracing::info!(
            query = %req.query,
            filter_unresolved = req.filter_unresolved,
            sort_order = %req.sort_order,
            total = shaped.total,
            returned = shaped.results.len(),
            "search completed"
        );

        Ok(SearchResponse::Found {
            results: shaped.results,
            total: shaped.total,
            query: req.query.clone(),
            filter_unresolved: req.filter_unresolved,
        })
    }

    /// Whether the indexer reports ingestion complete. Failures read as
    /// not ready.
    pub async fn ready(&self) -> bool {
        match self.indexer.health().await {
            Ok(ready) => ready,
            Err(e) => {
                tracing::warn!(kind = e.kind(), error = %e, "readiness check failed");
                false
            }
        }
    }

    /// Forward a status change to the indexer.
    ///
    /// Both fields are required; a missing or empty one is a
    /// [`GatewayError::Validation`] and no downstream call is made. Downstream
    /// failures are logged and collapsed to a generic update failure.
    pub async fn update_status(
        &self,
        email: Option<&str>,
        status: Option<&str>,
    ) -> GatewayResult<Value> {
        let (email, status) = match (email, status) {
            (Some(e), Some(s)) if !e.is_empty() && !s.is_empty() => (e, s),
            _ => return Err(GatewayError::Validation(STATUS_FIELDS_REQUIRED.to_string())),
        };

        match self.indexer.update_status(email, status).await {
            Ok(body) => {
                tracing::info!(email, status, "status updated");
                Ok(body)
            }
            Err(e) => {
                tracing::warn!(email, status, kind = e.kind(), error = %e, "status update failed");
                Err(GatewayError::DownstreamUnavailable(UPDATE_FAILED.to_string()))
            }
        }
    }

    /// Whether the engine itself answers. Used for gateway liveness only.
    pub async fn engine_reachable(&self) -> bool {
        self.engine.ping().await
    }
}

/// Filter and sort choices accompanying a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub filter_unresolved: bool,
    pub sort_order: crate::models::SortOrder,
}
