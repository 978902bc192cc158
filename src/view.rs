//! Client view: what the search page holds between requests and how it
//! renders results in a terminal.
//!
//! The view has no business logic of its own. It decides *when* to talk to
//! the gateway (sort changes reload, filter toggles wait for a submit) and
//! which status actions are available for each ticket.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;

use crate::gateway::MATCH_ALL;
use crate::models::{display_value, SearchRequest, SearchResponse, SearchResult, SortOrder};
use crate::models::{STATUS_REJECTED, STATUS_RESOLVED};

/// Status actions offered per ticket, in display order.
pub const STATUS_ACTIONS: [&str; 2] = [STATUS_RESOLVED, STATUS_REJECTED];

/// Markers wrapped around highlighted terms in terminal output.
pub const MARK_OPEN: &str = ">>>";
pub const MARK_CLOSE: &str = "<<<";

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub query: String,
    pub filter_unresolved: bool,
    pub sort_order: SortOrder,
    results: Vec<SearchResult>,
    error: Option<String>,
    updating: HashSet<String>,
}

impl ViewState {
    pub fn new(query: impl Into<String>, filter_unresolved: bool, sort_order: SortOrder) -> Self {
        Self {
            query: query.into(),
            filter_unresolved,
            sort_order,
            ..Self::default()
        }
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Error banner text, kept apart from the empty-results case.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The request a submit would send. Blank text becomes the match-all
    /// sentinel.
    pub fn search_request(&self) -> SearchRequest {
        let trimmed = self.query.trim();
        SearchRequest {
            query: if trimmed.is_empty() {
                MATCH_ALL.to_string()
            } else {
                trimmed.to_string()
            },
            filter_unresolved: self.filter_unresolved,
            sort_order: self.sort_order,
        }
    }

    /// The first load once the system is ready: every ticket, unfiltered,
    /// whatever the user has typed so far.
    pub fn initial_request(&self) -> SearchRequest {
        SearchRequest {
            query: MATCH_ALL.to_string(),
            filter_unresolved: false,
            sort_order: self.sort_order,
        }
    }

    /// Whether a submit would ask for something the initial load did not.
    pub fn has_refinement(&self) -> bool {
        !self.query.trim().is_empty() || self.filter_unresolved
    }

    pub fn apply_response(&mut self, response: SearchResponse) {
        match response {
            SearchResponse::Found { results, .. } => {
                self.results = results;
                self.error = None;
            }
            SearchResponse::Failed { results, error, .. } => {
                self.results = results;
                self.error = Some(error);
            }
        }
    }

    /// A request that never produced a response (transport failure).
    pub fn apply_failure(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Change the sort order. Returns `true` when the loaded results must be
    /// fetched again.
    pub fn set_sort_order(&mut self, order: SortOrder) -> bool {
        let changed = self.sort_order != order;
        self.sort_order = order;
        changed && !self.results.is_empty()
    }

    /// Toggle the unresolved-only filter. Takes effect on the next submit.
    pub fn set_filter_unresolved(&mut self, on: bool) {
        self.filter_unresolved = on;
    }

    pub fn is_updating(&self, email: &str) -> bool {
        self.updating.contains(email)
    }

    /// Mark an update for `email` as in flight. Returns `false` when one
    /// already is.
    pub fn begin_update(&mut self, email: &str) -> bool {
        self.updating.insert(email.to_string())
    }

    /// Settle an in-flight update. On success every loaded ticket of that
    /// customer takes the new status.
    pub fn finish_update(&mut self, email: &str, status: &str, succeeded: bool) {
        self.updating.remove(email);
        if succeeded {
            for r in self
                .results
                .iter_mut()
                .filter(|r| r.email() == Some(email))
            {
                r.status = Some(Value::from(status));
            }
        } else {
            self.error = Some("Failed to update status".to_string());
        }
    }

    /// Whether the action setting `target` is available for `result`.
    pub fn action_enabled(&self, result: &SearchResult, target: &str) -> bool {
        if result.status_text() == Some(target) {
            return false;
        }
        match result.email() {
            Some(email) => !self.is_updating(email),
            None => false,
        }
    }

    /// Summary line above the result list, if there are results.
    pub fn results_info(&self) -> Option<String> {
        if self.results.is_empty() {
            return None;
        }
        let suffix = if self.filter_unresolved {
            " (filtered for unresolved)"
        } else {
            ""
        };
        let q = self.query.trim();
        Some(if q.is_empty() {
            format!("Showing {} tickets{}", self.results.len(), suffix)
        } else {
            format!(
                "Found {} results for \"{}\"{}",
                self.results.len(),
                q,
                suffix
            )
        })
    }
}

pub fn priority_label(priority: i64) -> String {
    match priority {
        1 => "High".to_string(),
        2 => "Medium".to_string(),
        3 => "Low".to_string(),
        p => format!("P{}", p),
    }
}

/// Format an indexed timestamp as `Mar 1, 2024, 10:00`. Unparseable input
/// is returned unchanged.
pub fn format_date(raw: &str) -> String {
    const FORMAT: &str = "%b %-d, %Y, %H:%M";

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.format(FORMAT).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format(FORMAT).to_string();
        }
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return dt.format(FORMAT).to_string();
        }
    }
    raw.to_string()
}

/// Format a raw `created_date`. Numbers are read as epoch milliseconds.
pub fn format_date_value(raw: &Value) -> String {
    if let Some(millis) = raw.as_i64() {
        if let Some(dt) = chrono::DateTime::from_timestamp_millis(millis) {
            return dt.format("%b %-d, %Y, %H:%M").to_string();
        }
    }
    format_date(&display_value(raw))
}

/// Swap the engine's `<em>` highlight tags for terminal markers.
pub fn render_highlight(fragment: &str) -> String {
    fragment
        .replace("<em>", MARK_OPEN)
        .replace("</em>", MARK_CLOSE)
}

/// Highlighted text for `field` if the engine produced any, else the plain
/// value.
fn field_text(result: &SearchResult, field: &str, plain: Option<&Value>) -> String {
    match result.highlight(field) {
        Some(fragments) => fragments
            .iter()
            .map(|f| render_highlight(f))
            .collect::<Vec<_>>()
            .join(" … "),
        None => match plain {
            None | Some(Value::Null) => String::new(),
            Some(v) => display_value(v).into_owned(),
        },
    }
}

/// Render one result as an indented block.
pub fn render_result(index: usize, result: &SearchResult, view: &ViewState) -> String {
    let mut out = String::new();

    let title = field_text(result, "title", result.title.as_ref());
    out.push_str(&format!(
        "{}. [{}] {}\n",
        index + 1,
        priority_label(result.priority),
        if title.is_empty() { "(untitled)" } else { title.as_str() }
    ));

    out.push_str(&format!(
        "    status: {}    category: {}\n",
        result.status.as_ref().map(display_value).unwrap_or(Cow::Borrowed("-")),
        display_value(&result.category)
    ));
    if let Some(email) = result.customer_email.as_ref().filter(|v| !v.is_null()) {
        out.push_str(&format!("    customer: {}\n", display_value(email)));
    }
    if let Some(created) = result.created_date.as_ref().filter(|v| !v.is_null()) {
        out.push_str(&format!("    created: {}\n", format_date_value(created)));
    }

    let description = field_text(result, "description", result.description.as_ref());
    if !description.is_empty() {
        out.push_str(&format!(
            "    excerpt: \"{}\"\n",
            description.replace('\n', " ").trim()
        ));
    }

    let tags = result.tag_list();
    if !tags.is_empty() {
        let tags: Vec<String> = tags.iter().map(|t| format!("#{}", t)).collect();
        out.push_str(&format!("    tags: {}\n", tags.join(" ")));
    }

    let actions: Vec<String> = STATUS_ACTIONS
        .iter()
        .map(|a| {
            if view.action_enabled(result, a) {
                format!("[{}]", a)
            } else {
                format!("({} unavailable)", a)
            }
        })
        .collect();
    out.push_str(&format!("    actions: {}\n", actions.join(" ")));

    out
}

/// Render the whole view: error banner, summary line, then results.
pub fn render(view: &ViewState) -> String {
    let mut out = String::new();

    if let Some(err) = view.error() {
        out.push_str(&format!("error: {}\n\n", err));
    }

    match view.results_info() {
        Some(info) => {
            out.push_str(&info);
            out.push_str("\n\n");
            for (i, r) in view.results().iter().enumerate() {
                out.push_str(&render_result(i, r, view));
                out.push('\n');
            }
        }
        None if view.error().is_none() => out.push_str("No results.\n"),
        None => {}
    }

    out
}
