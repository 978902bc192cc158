//! Gateway configuration.
//!
//! Settings are read from an optional TOML file and then overridden by
//! environment variables, so container deployments can point the gateway
//! at a search engine with nothing more than `ES_HOST` / `ES_PORT`.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3001"
//!
//! [engine]
//! host = "elasticsearch"
//! port = 9200
//! index = "support_cases"
//!
//! [indexer]
//! url = "http://indexer:5000"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3001".to_string()
}

/// Connection settings for the full-text search engine.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_engine_scheme")]
    pub scheme: String,
    #[serde(default = "default_engine_host")]
    pub host: String,
    #[serde(default = "default_engine_port")]
    pub port: u16,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_engine_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheme: default_engine_scheme(),
            host: default_engine_host(),
            port: default_engine_port(),
            index: default_index(),
            timeout_secs: default_engine_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

fn default_engine_scheme() -> String {
    "http".to_string()
}
fn default_engine_host() -> String {
    "localhost".to_string()
}
fn default_engine_port() -> u16 {
    9200
}
fn default_index() -> String {
    "support_cases".to_string()
}
fn default_engine_timeout_secs() -> u64 {
    10
}
fn default_page_size() -> usize {
    100
}

impl EngineConfig {
    /// Base URL of the engine node, e.g. `http://localhost:9200`.
    pub fn node_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Connection settings for the external indexing/status service.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexerConfig {
    #[serde(default = "default_indexer_url")]
    pub url: String,
    #[serde(default = "default_indexer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            url: default_indexer_url(),
            timeout_secs: default_indexer_timeout_secs(),
        }
    }
}

fn default_indexer_url() -> String {
    "http://indexer:5000".to_string()
}
fn default_indexer_timeout_secs() -> u64 {
    5
}

impl IndexerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings used by the `tsg` client commands that talk to a running gateway.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_client_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_client_timeout_secs(),
        }
    }
}

fn default_gateway_url() -> String {
    "http://localhost:3001".to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_client_timeout_secs() -> u64 {
    15
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load configuration from `path` (if it exists), apply environment
/// overrides, and validate the result.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;

    Ok(config)
}

/// Apply `ES_HOST`, `ES_PORT`, `INDEXER_URL` and `TSG_BIND` on top of the
/// file values. The lookup is injected so tests don't touch process env.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("ES_HOST").filter(|v| !v.is_empty()) {
        config.engine.host = host;
    }
    if let Some(port) = lookup("ES_PORT").filter(|v| !v.is_empty()) {
        config.engine.port = port
            .parse()
            .with_context(|| format!("ES_PORT is not a valid port: '{}'", port))?;
    }
    if let Some(url) = lookup("INDEXER_URL").filter(|v| !v.is_empty()) {
        config.indexer.url = url;
    }
    if let Some(bind) = lookup("TSG_BIND").filter(|v| !v.is_empty()) {
        config.server.bind = bind;
    }
    Ok(())
}

pub fn validate(config: &Config) -> Result<()> {
    if config.engine.host.trim().is_empty() {
        bail!("engine.host must not be empty");
    }
    if config.engine.port == 0 {
        bail!("engine.port must be > 0");
    }
    if config.engine.index.trim().is_empty() {
        bail!("engine.index must not be empty");
    }
    if config.engine.timeout_secs == 0 {
        bail!("engine.timeout_secs must be > 0");
    }
    if !(1..=10_000).contains(&config.engine.page_size) {
        bail!("engine.page_size must be in [1, 10000]");
    }
    if config.indexer.url.trim().is_empty() {
        bail!("indexer.url must not be empty");
    }
    if config.indexer.timeout_secs == 0 {
        bail!("indexer.timeout_secs must be > 0");
    }
    if config.client.poll_interval_ms == 0 {
        bail!("client.poll_interval_ms must be > 0");
    }
    if config.client.timeout_secs == 0 {
        bail!("client.timeout_secs must be > 0");
    }
    Ok(())
}
