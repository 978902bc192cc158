//! Search engine abstraction and the Elasticsearch-compatible HTTP backend.
//!
//! The gateway only needs one capability from the engine: run a built
//! [`EngineQuery`] against the ticket index and hand back the raw response
//! body. Shaping that body is [`crate::shape`]'s job.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::query::EngineQuery;

/// A full-text engine holding the ticket index.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Execute `query` and return the engine's response body.
    async fn search(&self, query: &EngineQuery) -> GatewayResult<Value>;

    /// Whether the engine answers at all.
    async fn ping(&self) -> bool;
}

/// Engine reached over HTTP at `<node>/<index>/_search`.
///
/// Holds a single [`reqwest::Client`] for the process lifetime; every call
/// is bounded by the configured timeout.
pub struct ElasticsearchEngine {
    client: reqwest::Client,
    node_url: String,
    search_url: String,
}

impl ElasticsearchEngine {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        let node_url = config.node_url();
        let search_url = format!("{}/{}/_search", node_url, config.index);
        Ok(Self {
            client,
            node_url,
            search_url,
        })
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }
}

#[async_trait]
impl SearchEngine for ElasticsearchEngine {
    async fn search(&self, query: &EngineQuery) -> GatewayResult<Value> {
        let response = self
            .client
            .post(&self.search_url)
            .json(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::DownstreamUnavailable(format!(
                "engine returned {}: {}",
                status, body_text
            )));
        }

        let body: Value = response.json().await?;
        Ok(body)
    }

    async fn ping(&self) -> bool {
        match self.client.head(&self.node_url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
