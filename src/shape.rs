//! Result shaping: engine response → normalized ticket results.
//!
//! The engine's response is parsed into typed structs so that an unexpected
//! shape is detected once, here, and reported as
//! [`GatewayError::Malformed`]. Missing ticket fields are never an error:
//! `priority` and `category` take their defaults and everything else passes
//! through untouched.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{GatewayError, GatewayResult};
use crate::models::{SearchResult, Ticket, DEFAULT_CATEGORY, DEFAULT_PRIORITY};

#[derive(Debug, Deserialize)]
pub struct EngineResponse {
    pub hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Hit count, reported either bare or with a relation (`eq` / `gte`).
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Relation {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Count(n) => *n,
            TotalHits::Relation { value, .. } => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Ticket,
    #[serde(default)]
    pub highlight: Option<BTreeMap<String, Vec<String>>>,
}

/// Normalized search output.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedResults {
    pub results: Vec<SearchResult>,
    pub total: u64,
}

/// Parse a raw engine body.
pub fn parse_response(body: Value) -> GatewayResult<EngineResponse> {
    serde_json::from_value(body).map_err(|e| GatewayError::Malformed(e.to_string()))
}

/// Shape a parsed engine response.
///
/// When the engine omits the total, the number of returned hits is used.
pub fn shape_results(response: EngineResponse) -> ShapedResults {
    let hits = response.hits;
    let total = hits
        .total
        .as_ref()
        .map(TotalHits::value)
        .unwrap_or(hits.hits.len() as u64);

    let results = hits.hits.into_iter().map(shape_hit).collect();

    ShapedResults { results, total }
}

/// Parse and shape in one step.
pub fn shape_body(body: Value) -> GatewayResult<ShapedResults> {
    parse_response(body).map(shape_results)
}

fn shape_hit(hit: Hit) -> SearchResult {
    let Ticket {
        title,
        description,
        customer_email,
        tags,
        status,
        created_date,
        priority,
        category,
    } = hit.source;

    SearchResult {
        id: hit.id,
        title,
        description,
        customer_email,
        tags,
        status,
        created_date,
        priority: resolve_priority(priority.as_ref()),
        category: resolve_category(category),
        score: hit.score,
        highlights: hit.highlight,
    }
}

/// Null, empty, `false` and zero categories fall back to the default; any
/// other value is kept as indexed.
fn resolve_category(raw: Option<Value>) -> Value {
    match raw {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Value::from(DEFAULT_CATEGORY),
        Some(Value::String(s)) if s.is_empty() => Value::from(DEFAULT_CATEGORY),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Value::from(DEFAULT_CATEGORY),
        Some(other) => other,
    }
}

/// Indexed priorities may arrive as integers, floats or numeric strings
/// depending on how the ingesting job typed its columns. Absent, null, zero
/// and unparsable values all fall back to the default tier.
fn resolve_priority(raw: Option<&Value>) -> i64 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    };
    match parsed {
        Some(p) if p != 0 => p,
        _ => DEFAULT_PRIORITY,
    }
}
