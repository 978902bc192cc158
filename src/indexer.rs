//! Client for the external indexing/status service.
//!
//! The indexer owns ingestion and status mutation. The gateway only asks it
//! two things: whether ingestion has finished (`GET /health`) and to change a
//! ticket's status by customer email (`POST /update_status`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::IndexerConfig;
use crate::error::{GatewayError, GatewayResult};

#[async_trait]
pub trait StatusService: Send + Sync {
    /// The indexer's readiness flag.
    async fn health(&self) -> GatewayResult<bool>;

    /// Ask the indexer to set `status` on the tickets of `email`, returning
    /// its response body verbatim.
    async fn update_status(&self, email: &str, status: &str) -> GatewayResult<Value>;
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    ready: bool,
}

/// [`StatusService`] over HTTP.
pub struct HttpStatusService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusService {
    pub fn new(config: &IndexerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl StatusService for HttpStatusService {
    async fn health(&self) -> GatewayResult<bool> {
        let response = self.client.get(self.url("health")).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::DownstreamUnavailable(format!(
                "indexer health returned {}",
                status
            )));
        }

        let body: Value = response.json().await?;
        let health: HealthBody = serde_json::from_value(body)?;
        Ok(health.ready)
    }

    async fn update_status(&self, email: &str, status: &str) -> GatewayResult<Value> {
        let response = self
            .client
            .post(self.url("update_status"))
            .json(&json!({ "email": email, "status": status }))
            .send()
            .await?;

        let code = response.status();
        if !code.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::DownstreamUnavailable(format!(
                "indexer update_status returned {}: {}",
                code, body_text
            )));
        }

        Ok(response.json().await?)
    }
}
