//! Core data models shared by the gateway, the HTTP surface and the client.
//!
//! Tickets live in the search engine's index; this crate never creates or
//! deletes them. Everything here is either a view of an indexed ticket or a
//! transient request/response payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Status value the unresolved-only filter excludes.
pub const STATUS_RESOLVED: &str = "resolved";
/// Status value offered by the client for rejecting a ticket.
pub const STATUS_REJECTED: &str = "rejected";

/// Priority assigned to tickets indexed without one (low).
pub const DEFAULT_PRIORITY: i64 = 3;
/// Category assigned to tickets indexed without one.
pub const DEFAULT_CATEGORY: &str = "general";

/// A ticket document as stored in the engine's `_source`.
///
/// Every field is optional and kept as raw JSON: documents are shaped by an
/// external indexer, so a date may arrive as epoch millis and tags as an
/// array. One odd document must not fail the whole page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Ticket {
    pub title: Option<Value>,
    pub description: Option<Value>,
    pub customer_email: Option<Value>,
    /// Usually a whitespace-delimited string; split only when rendering.
    pub tags: Option<Value>,
    pub status: Option<Value>,
    pub created_date: Option<Value>,
    pub priority: Option<Value>,
    pub category: Option<Value>,
}

/// Text for a raw field value: strings as-is, anything else as JSON.
pub fn display_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Priority ordering requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "priority-high-to-low")]
    PriorityHighToLow,
    #[serde(rename = "priority-low-to-high")]
    PriorityLowToHigh,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::PriorityHighToLow => "priority-high-to-low",
            SortOrder::PriorityLowToHigh => "priority-low-to-high",
        }
    }

    /// Interpret the `sortOrder` query parameter.
    ///
    /// A missing parameter means high-to-low. Any value other than
    /// `priority-high-to-low` selects low-to-high.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("priority-high-to-low") => SortOrder::PriorityHighToLow,
            Some(_) => SortOrder::PriorityLowToHigh,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "priority-high-to-low" | "high-to-low" => Ok(SortOrder::PriorityHighToLow),
            "priority-low-to-high" | "low-to-high" => Ok(SortOrder::PriorityLowToHigh),
            other => Err(format!(
                "unknown sort order '{}': use priority-high-to-low or priority-low-to-high",
                other
            )),
        }
    }
}

/// One search call's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub filter_unresolved: bool,
    pub sort_order: SortOrder,
}

/// A ticket hit after shaping: source fields plus score and highlights.
///
/// Source fields other than `priority` pass through exactly as indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<Value>,
    pub priority: i64,
    pub category: Value,
    #[serde(default)]
    pub score: Option<f64>,
    /// Field name → highlighted fragments (`<em>` marks the match).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<BTreeMap<String, Vec<String>>>,
}

fn as_text(field: &Option<Value>) -> Option<&str> {
    field.as_ref().and_then(Value::as_str)
}

impl SearchResult {
    /// Customer email, when indexed as a string.
    pub fn email(&self) -> Option<&str> {
        as_text(&self.customer_email)
    }

    /// Current status, when indexed as a string.
    pub fn status_text(&self) -> Option<&str> {
        as_text(&self.status)
    }

    /// Tags split on whitespace. An array of tags is taken element-wise.
    pub fn tag_list(&self) -> Vec<String> {
        match &self.tags {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| display_value(v).into_owned())
                .collect(),
            Some(other) => vec![other.to_string()],
        }
    }

    /// Highlighted fragments for `field`, if the engine produced any.
    pub fn highlight(&self, field: &str) -> Option<&[String]> {
        self.highlights
            .as_ref()
            .and_then(|h| h.get(field))
            .map(|v| v.as_slice())
            .filter(|v| !v.is_empty())
    }
}

/// Body of `GET /search`.
///
/// The two shapes are told apart by their keys: a success carries `total`,
/// a failure carries `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Found {
        results: Vec<SearchResult>,
        total: u64,
        query: String,
        #[serde(rename = "filterUnresolved")]
        filter_unresolved: bool,
    },
    Failed {
        results: Vec<SearchResult>,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },
}

impl SearchResponse {
    pub fn results(&self) -> &[SearchResult] {
        match self {
            SearchResponse::Found { results, .. } | SearchResponse::Failed { results, .. } => {
                results
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SearchResponse::Found { .. } => None,
            SearchResponse::Failed { error, .. } => Some(error),
        }
    }
}

/// Body of `GET /ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub ready: bool,
}

/// Body of `POST /update-status`. Both fields are required but modelled as
/// optional so a missing one is reported as a validation error, not a
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
