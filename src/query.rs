//! Query construction for ticket search.
//!
//! [`build_query`] turns free text plus the caller's filter and sort
//! choices into an [`EngineQuery`]: a typed request that serializes to the
//! engine's native query DSL.
//!
//! # Shape
//!
//! ```text
//! bool
//! ├── should (minimum_should_match = number of should clauses)
//! │   ├── wildcard customer_email  *text*        boost 10.0
//! │   ├── match    title           fuzziness AUTO boost 5.0
//! │   ├── match    description                    boost 2.0
//! │   └── match    tags                           boost 0.5
//! └── filter
//!     └── bool.must_not term status = "resolved"  (unresolved-only)
//! sort: _score asc, priority (per SortOrder), created_date asc
//! highlight: title, description
//! size: 100
//! ```
//!
//! The `should` container is OR-shaped, but every clause is required to
//! match: [`BoolQuery`] derives `minimum_should_match` from its clause count
//! so the two can never drift apart. Boosts only affect scoring.
//!
//! The primary sort key is the relevance score *ascending*. Results are
//! returned least-relevant first; this ordering is pinned by tests.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::models::{SortOrder, STATUS_RESOLVED};

/// Result cap per search. There is no pagination.
pub const PAGE_SIZE: usize = 100;

pub const EMAIL_BOOST: f64 = 10.0;
pub const TITLE_BOOST: f64 = 5.0;
pub const DESCRIPTION_BOOST: f64 = 2.0;
pub const TAGS_BOOST: f64 = 0.5;

/// Edit-distance tolerance for a match clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    /// Tolerance scaled to term length (engine `"AUTO"`).
    Auto,
}

impl Fuzziness {
    fn as_str(&self) -> &'static str {
        match self {
            Fuzziness::Auto => "AUTO",
        }
    }
}

/// Analyzed full-text match on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub field: String,
    pub query: String,
    pub boost: f64,
    pub fuzziness: Option<Fuzziness>,
}

/// Pattern match on a non-analyzed field.
#[derive(Debug, Clone, PartialEq)]
pub struct WildcardClause {
    pub field: String,
    pub value: String,
    pub boost: f64,
}

/// Unscored restriction on the candidate set.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Drop documents whose `field` equals `value` exactly.
    ExcludeTerm { field: String, value: String },
}

/// Container in which every `should` clause must match.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolQuery {
    should: Vec<QueryDocument>,
    filter: Vec<FilterClause>,
}

impl BoolQuery {
    /// A query requiring all of `should` to match.
    pub fn all_of(should: Vec<QueryDocument>) -> Self {
        Self {
            should,
            filter: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: FilterClause) -> Self {
        self.filter.push(filter);
        self
    }

    pub fn should(&self) -> &[QueryDocument] {
        &self.should
    }

    pub fn filters(&self) -> &[FilterClause] {
        &self.filter
    }

    /// Always the number of `should` clauses.
    pub fn minimum_should_match(&self) -> usize {
        self.should.len()
    }
}

/// A node of the engine query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryDocument {
    Bool(BoolQuery),
    Match(MatchClause),
    Wildcard(WildcardClause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Score,
    Priority,
    CreatedDate,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Score => "_score",
            SortField::Priority => "priority",
            SortField::CreatedDate => "created_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Complete search request body: query, sort, highlight and size.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineQuery {
    pub query: QueryDocument,
    pub sort: Vec<SortKey>,
    pub highlight_fields: Vec<String>,
    pub size: usize,
}

impl EngineQuery {
    /// Override the result cap.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// The root bool query.
    pub fn root(&self) -> Option<&BoolQuery> {
        match &self.query {
            QueryDocument::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        let sort: Vec<Value> = self
            .sort
            .iter()
            .map(|k| json!({ k.field.as_str(): { "order": k.direction.as_str() } }))
            .collect();

        let mut fields = Map::new();
        for f in &self.highlight_fields {
            fields.insert(f.clone(), json!({}));
        }

        json!({
            "query": self.query.to_json(),
            "sort": sort,
            "highlight": { "fields": fields },
            "size": self.size,
        })
    }
}

impl Serialize for EngineQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl QueryDocument {
    pub fn to_json(&self) -> Value {
        match self {
            QueryDocument::Bool(b) => {
                let should: Vec<Value> = b.should.iter().map(|c| c.to_json()).collect();
                let filter: Vec<Value> = b.filter.iter().map(|f| f.to_json()).collect();
                json!({
                    "bool": {
                        "must": [],
                        "should": should,
                        "filter": filter,
                        "minimum_should_match": b.minimum_should_match(),
                    }
                })
            }
            QueryDocument::Match(m) => {
                let mut inner = json!({ "query": m.query, "boost": m.boost });
                if let Some(fuzz) = m.fuzziness {
                    inner["fuzziness"] = json!(fuzz.as_str());
                }
                json!({ "match": { m.field.as_str(): inner } })
            }
            QueryDocument::Wildcard(w) => json!({
                "wildcard": { w.field.as_str(): { "value": w.value, "boost": w.boost } }
            }),
        }
    }

    /// Boost of a leaf clause; `None` for containers.
    pub fn boost(&self) -> Option<f64> {
        match self {
            QueryDocument::Match(m) => Some(m.boost),
            QueryDocument::Wildcard(w) => Some(w.boost),
            QueryDocument::Bool(_) => None,
        }
    }

    /// Field a leaf clause targets.
    pub fn field(&self) -> Option<&str> {
        match self {
            QueryDocument::Match(m) => Some(&m.field),
            QueryDocument::Wildcard(w) => Some(&w.field),
            QueryDocument::Bool(_) => None,
        }
    }
}

impl FilterClause {
    pub fn to_json(&self) -> Value {
        match self {
            FilterClause::ExcludeTerm { field, value } => json!({
                "bool": { "must_not": { "term": { field.as_str(): value } } }
            }),
        }
    }
}

/// Build the ticket search request for `text`.
///
/// `text` must be non-empty; callers substitute `*` for blank input.
pub fn build_query(text: &str, unresolved_only: bool, sort_order: SortOrder) -> EngineQuery {
    let should = vec![
        QueryDocument::Wildcard(WildcardClause {
            field: "customer_email".to_string(),
            value: format!("*{}*", text),
            boost: EMAIL_BOOST,
        }),
        QueryDocument::Match(MatchClause {
            field: "title".to_string(),
            query: text.to_string(),
            boost: TITLE_BOOST,
            fuzziness: Some(Fuzziness::Auto),
        }),
        QueryDocument::Match(MatchClause {
            field: "description".to_string(),
            query: text.to_string(),
            boost: DESCRIPTION_BOOST,
            fuzziness: None,
        }),
        QueryDocument::Match(MatchClause {
            field: "tags".to_string(),
            query: text.to_string(),
            boost: TAGS_BOOST,
            fuzziness: None,
        }),
    ];

    let mut root = BoolQuery::all_of(should);
    if unresolved_only {
        root = root.with_filter(FilterClause::ExcludeTerm {
            field: "status".to_string(),
            value: STATUS_RESOLVED.to_string(),
        });
    }

    let priority_direction = match sort_order {
        SortOrder::PriorityHighToLow => SortDirection::Desc,
        SortOrder::PriorityLowToHigh => SortDirection::Asc,
    };

    EngineQuery {
        query: QueryDocument::Bool(root),
        sort: vec![
            SortKey {
                field: SortField::Score,
                direction: SortDirection::Asc,
            },
            SortKey {
                field: SortField::Priority,
                direction: priority_direction,
            },
            SortKey {
                field: SortField::CreatedDate,
                direction: SortDirection::Asc,
            },
        ],
        highlight_fields: vec!["title".to_string(), "description".to_string()],
        size: PAGE_SIZE,
    }
}
