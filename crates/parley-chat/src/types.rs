//! Shared types for the turn pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_store::{ChangeAnalysis, Record};

/// Known table and domain-object names scanned for in user text.
///
/// Generic words come first so that a more specific table name mentioned in
/// the same utterance wins the last-match-takes-current-table rule.
pub const TABLE_VOCABULARY: &[&str] = &[
    "hcp",
    "version",
    "list_requests",
    "list_versions",
    "target_list_entries",
    "call_list_entries",
    "competitor_target_entries",
    "digital_engagement_entries",
    "formulary_decision_maker_entries",
    "high_value_prescriber_entries",
    "idn_health_system_entries",
    "work_logs",
];

/// Semantic category steering query generation and answer formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCategory {
    VersionComparison,
    History,
    Attribution,
    CurrentState,
    ListAll,
    AdHocSelect,
    Conversation,
    /// Anything the classifier returned that is not a known category.
    /// Carried opaquely; downstream falls back to the generic display.
    Other(String),
}

impl QueryCategory {
    /// Parse a classifier output token. Unknown tokens pass through opaquely.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "version_comparison" => Self::VersionComparison,
            "history" => Self::History,
            "attribution" => Self::Attribution,
            "current_state" => Self::CurrentState,
            "list_all" => Self::ListAll,
            "ad_hoc_select" => Self::AdHocSelect,
            "conversation" => Self::Conversation,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::VersionComparison => "version_comparison",
            Self::History => "history",
            Self::Attribution => "attribution",
            Self::CurrentState => "current_state",
            Self::ListAll => "list_all",
            Self::AdHocSelect => "ad_hoc_select",
            Self::Conversation => "conversation",
            Self::Other(s) => s,
        }
    }

    /// Whether rows get the size-tiered direct display treatment.
    pub fn is_direct_display(&self) -> bool {
        matches!(self, Self::ListAll | Self::AdHocSelect)
    }
}

/// A lexical marker remembered for anaphora resolution.
///
/// Tagged rather than prefix-encoded so a name value can never collide with
/// a table flag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntityKey {
    /// A table the session has referenced.
    Table(String),
    /// A proper name surfaced in query results.
    Name(String),
}

impl EntityKey {
    /// Display label using the `table_` / `name_` namespacing.
    pub fn label(&self) -> String {
        match self {
            Self::Table(t) => format!("table_{}", t),
            Self::Name(n) => format!("name_{}", n),
        }
    }

    /// The raw value used for substring matching against user text.
    pub fn value(&self) -> &str {
        match self {
            Self::Table(t) => t,
            Self::Name(n) => n,
        }
    }
}

/// One completed turn as remembered in session history.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRecord {
    pub turn: u64,
    pub query_text: String,
    pub generated_query: Option<String>,
    pub row_count: usize,
    pub timestamp: DateTime<Utc>,
    pub response_preview: String,
}

/// Rows cached for later reference, keyed by turn number.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub query: String,
    pub rows: Vec<Record>,
    pub total_row_count: usize,
}

/// The session's current focus, updated every turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    pub current_table: Option<String>,
    pub last_query_type: Option<String>,
    pub active_request_id: Option<i64>,
    pub last_results_summary: String,
    pub mentioned_tables: Vec<String>,
    pub last_composed_query: Option<String>,
    pub last_result_count: usize,
}

/// One transcript entry (user or assistant).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptMessage {
    pub role: String,
    pub content: String,
    pub category: Option<String>,
}

/// Advisory lexical signals the router computes but does not act on.
///
/// Retained for observability and future refinement of the deliberately
/// permissive always-re-query policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteSignals {
    pub looks_like_new_query: bool,
    pub looks_like_follow_up: bool,
    pub references_prior_results: bool,
    pub entity_match: bool,
}

/// The router's verdict for a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub needs_data: bool,
    pub mentioned_tables: Vec<String>,
    pub signals: RouteSignals,
}

/// Ephemeral working record threaded through the pipeline stages.
///
/// Dropped after the turn; only derived facts are folded into the session
/// memory and context.
#[derive(Debug, Clone)]
pub struct TurnState {
    pub user_text: String,
    pub needs_data: bool,
    pub signals: RouteSignals,
    pub category: QueryCategory,
    pub generated_query: Option<String>,
    pub rows: Vec<Record>,
    pub change_analysis: Option<ChangeAnalysis>,
    pub answer: String,
}

impl TurnState {
    pub fn new(user_text: &str, decision: &RouteDecision) -> Self {
        Self {
            user_text: user_text.to_string(),
            needs_data: decision.needs_data,
            signals: decision.signals,
            category: QueryCategory::Conversation,
            generated_query: None,
            rows: Vec::new(),
            change_analysis: None,
            answer: String::new(),
        }
    }
}

/// What a processed turn hands back to the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub answer: String,
    pub generated_query: Option<String>,
    pub row_count: usize,
    pub category: Option<String>,
}
