//! Client side of the gateway: an HTTP client for its endpoints and the
//! readiness poll loop the client view runs before its first search.
//!
//! # Poll loop
//!
//! ```text
//!   tick ──▶ probe in flight? ──yes──▶ skip
//!                 │ no
//!                 ▼
//!          spawn probe ──▶ ready? ──yes──▶ PollOutcome::Ready
//!                              │ no / error
//!                              ▼
//!                         wait next tick        (shutdown ─▶ Cancelled)
//! ```
//!
//! Probes run on their own task so a slow gateway never delays the ticker,
//! and at most one probe is outstanding at any time.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::config::ClientConfig;
use crate::models::{ReadyResponse, SearchRequest, SearchResponse};

/// HTTP client for a running gateway.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        let filter = if req.filter_unresolved { "true" } else { "false" };
        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", req.query.as_str()),
                ("filterUnresolved", filter),
                ("sortOrder", req.sort_order.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("search request failed: HTTP {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    pub async fn ready(&self) -> Result<bool> {
        let resp = self
            .http
            .get(format!("{}/ready", self.base_url))
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("ready request failed: HTTP {}", resp.status());
        }
        let body: ReadyResponse = resp.json().await?;
        Ok(body.ready)
    }

    /// Returns the indexer's response body, or an error carrying the
    /// gateway's `error` message.
    pub async fn update_status(&self, email: &str, status: &str) -> Result<Value> {
        let resp = self
            .http
            .post(format!("{}/update-status", self.base_url))
            .json(&json!({ "email": email, "status": status }))
            .send()
            .await?;

        let code = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if !code.is_success() {
            let msg = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("Failed to update status");
            bail!("{}", msg);
        }
        Ok(body)
    }
}

/// Something that can answer "is the system ready?".
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn probe(&self) -> Result<bool>;
}

#[async_trait]
impl ReadinessProbe for GatewayClient {
    async fn probe(&self) -> Result<bool> {
        self.ready().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    Cancelled,
}

/// Fixed-interval readiness poller that never overlaps probes.
pub struct ReadinessPoller {
    interval: Duration,
    probes: AtomicU64,
    skipped: AtomicU64,
}

impl ReadinessPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            probes: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Probes started so far.
    pub fn probes(&self) -> u64 {
        self.probes.load(Ordering::SeqCst)
    }

    /// Ticks skipped because a probe was still outstanding.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Poll until `probe` reports ready or `shutdown` flips to `true`.
    ///
    /// The first probe fires immediately. Probe errors count as not ready.
    pub async fn run<P>(&self, probe: Arc<P>, mut shutdown: watch::Receiver<bool>) -> PollOutcome
    where
        P: ReadinessProbe + ?Sized + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<bool>(1);
        // Cleared only once the loop has consumed the probe's answer.
        let mut in_flight = false;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                return PollOutcome::Cancelled;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return PollOutcome::Cancelled;
                    }
                }
                Some(ready) = rx.recv() => {
                    in_flight = false;
                    if ready {
                        return PollOutcome::Ready;
                    }
                }
                _ = ticker.tick() => {
                    if in_flight {
                        self.skipped.fetch_add(1, Ordering::SeqCst);
                        tracing::debug!("readiness probe still in flight, skipping tick");
                        continue;
                    }
                    in_flight = true;
                    self.probes.fetch_add(1, Ordering::SeqCst);

                    let probe = probe.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let ready = match probe.probe().await {
                            Ok(r) => r,
                            Err(e) => {
                                tracing::debug!(error = %e, "readiness probe failed");
                                false
                            }
                        };
                        let _ = tx.send(ready).await;
                    });
                }
            }
        }
    }
}
