//! Shared fixtures for the integration tests: an in-memory engine that
//! evaluates built queries against a handful of ticket documents, a fake
//! indexer served over HTTP, and helpers to run the gateway on an
//! ephemeral port.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::cmp::Ordering as CmpOrdering;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ticket_search_gateway::config::EngineConfig;
use ticket_search_gateway::engine::{ElasticsearchEngine, SearchEngine};
use ticket_search_gateway::error::{GatewayError, GatewayResult};
use ticket_search_gateway::gateway::Gateway;
use ticket_search_gateway::indexer::StatusService;
use ticket_search_gateway::query::{
    EngineQuery, FilterClause, Fuzziness, QueryDocument, SortDirection, SortField,
};
use ticket_search_gateway::server::build_router;

// ─── Fixture engine ─────────────────────────────────────────────────

/// Engine holding `(id, _source)` pairs and applying the query tree the way
/// a real engine would: required should-clauses, exclusion filters, summed
/// boosts, multi-key sort and `<em>` highlights.
pub struct FixtureEngine {
    docs: Vec<(String, Value)>,
    calls: AtomicUsize,
    last_query: Mutex<Option<EngineQuery>>,
}

impl FixtureEngine {
    pub fn new(docs: Vec<(&str, Value)>) -> Self {
        Self {
            docs: docs
                .into_iter()
                .map(|(id, src)| (id.to_string(), src))
                .collect(),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<EngineQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

fn field_str<'a>(src: &'a Value, field: &str) -> &'a str {
    src.get(field).and_then(|v| v.as_str()).unwrap_or("")
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut cur = vec![i; b.len() + 1];
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        prev = cur;
    }
    prev[b.len()]
}

fn auto_fuzz(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn term_matches(query_term: &str, field_term: &str, fuzziness: Option<Fuzziness>) -> bool {
    match fuzziness {
        Some(Fuzziness::Auto) => edit_distance(query_term, field_term) <= auto_fuzz(query_term),
        None => query_term == field_term,
    }
}

fn clause_matches(clause: &QueryDocument, src: &Value) -> bool {
    match clause {
        QueryDocument::Match(m) => {
            let field_terms = tokens(field_str(src, &m.field));
            tokens(&m.query).iter().any(|q| {
                field_terms
                    .iter()
                    .any(|f| term_matches(q, f, m.fuzziness))
            })
        }
        QueryDocument::Wildcard(w) => {
            let needle = w.value.trim_matches('*');
            field_str(src, &w.field).contains(needle)
        }
        QueryDocument::Bool(_) => false,
    }
}

fn excluded(filter: &FilterClause, src: &Value) -> bool {
    match filter {
        FilterClause::ExcludeTerm { field, value } => field_str(src, field) == value,
    }
}

fn highlight(text: &str, query: &str, fuzziness: Option<Fuzziness>) -> Option<String> {
    let q_terms = tokens(query);
    let mut hit = false;
    let words: Vec<String> = text
        .split(' ')
        .map(|w| {
            let bare = w.to_lowercase();
            let bare = bare.trim_matches(|c: char| !c.is_alphanumeric());
            if !bare.is_empty() && q_terms.iter().any(|q| term_matches(q, bare, fuzziness)) {
                hit = true;
                format!("<em>{}</em>", w)
            } else {
                w.to_string()
            }
        })
        .collect();
    hit.then(|| words.join(" "))
}

fn compare(a: &(f64, &Value), b: &(f64, &Value), query: &EngineQuery) -> CmpOrdering {
    for key in &query.sort {
        let ord = match key.field {
            SortField::Score => a.0.partial_cmp(&b.0).unwrap_or(CmpOrdering::Equal),
            SortField::Priority => {
                let pa = a.1.get("priority").and_then(|v| v.as_i64()).unwrap_or(i64::MAX);
                let pb = b.1.get("priority").and_then(|v| v.as_i64()).unwrap_or(i64::MAX);
                pa.cmp(&pb)
            }
            SortField::CreatedDate => {
                field_str(a.1, "created_date").cmp(field_str(b.1, "created_date"))
            }
        };
        let ord = match key.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != CmpOrdering::Equal {
            return ord;
        }
    }
    CmpOrdering::Equal
}

#[async_trait]
impl SearchEngine for FixtureEngine {
    async fn search(&self, query: &EngineQuery) -> GatewayResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());

        let root = query
            .root()
            .ok_or_else(|| GatewayError::Malformed("expected bool root".to_string()))?;

        let mut matched: Vec<(f64, &str, &Value, Value)> = Vec::new();
        for (id, src) in &self.docs {
            let hits: Vec<&QueryDocument> = root
                .should()
                .iter()
                .filter(|c| clause_matches(c, src))
                .collect();
            if hits.len() < root.minimum_should_match() {
                continue;
            }
            if root.filters().iter().any(|f| excluded(f, src)) {
                continue;
            }

            let score: f64 = hits.iter().filter_map(|c| c.boost()).sum();

            let mut hl = serde_json::Map::new();
            for field in &query.highlight_fields {
                for c in &hits {
                    if let QueryDocument::Match(m) = c {
                        if &m.field == field {
                            if let Some(h) = highlight(field_str(src, field), &m.query, m.fuzziness)
                            {
                                hl.insert(field.clone(), json!([h]));
                            }
                        }
                    }
                }
            }

            matched.push((score, id.as_str(), src, Value::Object(hl)));
        }

        matched.sort_by(|a, b| compare(&(a.0, a.2), &(b.0, b.2), query));
        let total = matched.len();
        matched.truncate(query.size);

        let hits: Vec<Value> = matched
            .into_iter()
            .map(|(score, id, src, hl)| {
                let mut hit = json!({ "_id": id, "_score": score, "_source": src });
                if hl.as_object().map(|m| !m.is_empty()).unwrap_or(false) {
                    hit["highlight"] = hl;
                }
                hit
            })
            .collect();

        Ok(json!({
            "took": 1,
            "hits": { "total": { "value": total, "relation": "eq" }, "hits": hits }
        }))
    }

    async fn ping(&self) -> bool {
        true
    }
}

/// Three laptop tickets (priorities 1, 2, 3) whose creation order differs
/// from their priority order, one resolved, plus a non-matching ticket.
pub fn laptop_fixture() -> Vec<(&'static str, Value)> {
    vec![
        (
            "t-high",
            json!({
                "title": "Laptop overheating",
                "description": "Customer laptop shuts down under load",
                "customer_email": "laptop.alice@example.com",
                "tags": "hardware laptop thermal",
                "status": "open",
                "created_date": "2024-01-03T09:00:00",
                "priority": 1,
                "category": "hardware"
            }),
        ),
        (
            "t-medium",
            json!({
                "title": "Laptop battery drains fast",
                "description": "Battery on the laptop lasts one hour",
                "customer_email": "laptop.bob@example.com",
                "tags": "battery laptop",
                "status": "resolved",
                "created_date": "2024-01-01T09:00:00",
                "priority": 2
            }),
        ),
        (
            "t-low",
            json!({
                "title": "Laptop keyboard sticky",
                "description": "Some laptop keys stick",
                "customer_email": "laptop.carol@example.com",
                "tags": "laptop keyboard",
                "status": "open",
                "created_date": "2024-01-02T09:00:00",
                "priority": 3
            }),
        ),
        (
            "t-other",
            json!({
                "title": "Laptop docking station",
                "description": "Dock does not detect the laptop",
                "customer_email": "dave@example.com",
                "tags": "laptop dock",
                "status": "open",
                "created_date": "2024-01-04T09:00:00",
                "priority": 1
            }),
        ),
    ]
}

// ─── Indexer fakes ──────────────────────────────────────────────────

/// In-process [`StatusService`] that never touches the network.
pub struct StubIndexer {
    pub ready: bool,
    pub calls: AtomicUsize,
}

impl StubIndexer {
    pub fn ready() -> Self {
        Self {
            ready: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StatusService for StubIndexer {
    async fn health(&self) -> GatewayResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ready)
    }

    async fn update_status(&self, _email: &str, _status: &str) -> GatewayResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "success": true }))
    }
}

/// Behaviour of the HTTP fake indexer.
pub struct FakeIndexer {
    pub ready: bool,
    pub fail_updates: bool,
    pub delay: Duration,
    pub updates: Mutex<Vec<(String, String)>>,
}

impl FakeIndexer {
    pub fn new(ready: bool) -> Self {
        Self {
            ready,
            fail_updates: false,
            delay: Duration::ZERO,
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

async fn fake_health(State(state): State<Arc<FakeIndexer>>) -> Json<Value> {
    tokio::time::sleep(state.delay).await;
    Json(json!({ "ready": state.ready, "timestamp": 1_700_000_000_000u64 }))
}

async fn fake_update(
    State(state): State<Arc<FakeIndexer>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    tokio::time::sleep(state.delay).await;
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let status = body["status"].as_str().unwrap_or_default().to_string();
    state.updates.lock().unwrap().push((email, status));
    if state.fail_updates {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "update_by_query failed" })),
        )
    } else {
        (StatusCode::OK, Json(json!({ "success": true })))
    }
}

/// Serve a fake indexer on an ephemeral port and return its base URL.
pub async fn spawn_fake_indexer(state: Arc<FakeIndexer>) -> String {
    let app = Router::new()
        .route("/health", get(fake_health))
        .route("/update_status", post(fake_update))
        .with_state(state);
    let addr = serve(app).await;
    format!("http://{}", addr)
}

// ─── Engine node fake ───────────────────────────────────────────────

/// Behaviour of an HTTP engine node serving `/{index}/_search`.
pub struct FakeEngineNode {
    pub status: StatusCode,
    pub body: Value,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeEngineNode {
    pub fn answering(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn fake_engine_search(State(state): State<Arc<FakeEngineNode>>) -> (StatusCode, Json<Value>) {
    state.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.delay).await;
    (state.status, Json(state.body.clone()))
}

/// Serve a fake engine node on an ephemeral port and return its base URL.
pub async fn spawn_fake_engine(state: Arc<FakeEngineNode>) -> String {
    let app = Router::new()
        .route("/{index}/_search", post(fake_engine_search))
        .with_state(state);
    let addr = serve(app).await;
    format!("http://{}", addr)
}

/// An HTTP engine client pointed at `base` (`http://127.0.0.1:<port>`).
pub fn engine_at(base: &str, timeout_secs: u64) -> ElasticsearchEngine {
    let port = base
        .rsplit(':')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap();
    ElasticsearchEngine::new(&EngineConfig {
        host: "127.0.0.1".to_string(),
        port,
        timeout_secs,
        ..EngineConfig::default()
    })
    .unwrap()
}

// ─── Server helpers ─────────────────────────────────────────────────

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Run the gateway router on an ephemeral port; returns its base URL.
pub async fn spawn_gateway(gateway: Gateway) -> String {
    let addr = serve(build_router(Arc::new(gateway))).await;
    format!("http://{}", addr)
}

/// A URL nothing is listening on.
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
