//! Per-session memory: bounded history, result cache, entity index,
//! rolling summary.
//!
//! The memory update runs once per turn, after the answer is composed, and
//! applies its steps in a fixed order so invariants hold even when a stage
//! upstream failed.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::types::{
    CachedResult, EntityKey, SessionContext, TurnRecord, TurnState, TABLE_VOCABULARY,
};

/// History keeps at most this many turn records (strict FIFO eviction).
pub const HISTORY_CAP: usize = 10;
/// At most this many rows are cached per turn.
pub const CACHE_ROW_CAP: usize = 50;
/// The rolling summary regenerates every N turns.
pub const SUMMARY_INTERVAL: u64 = 3;
/// The rolling summary covers the most recent N turn records.
pub const SUMMARY_WINDOW: usize = 5;
/// Answer preview length stored per turn record, in characters.
pub const PREVIEW_CHARS: usize = 200;
/// Entity extraction inspects at most this many result rows.
const ENTITY_ROW_SCAN: usize = 5;

static FROM_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFROM\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Extract the target table from generated query text (first FROM match).
pub fn table_from_query(query: &str) -> Option<String> {
    FROM_TABLE_RE
        .captures(query)
        .map(|caps| caps[1].to_string())
}

/// Mutable per-session record of everything remembered across turns.
#[derive(Debug, Clone, Default)]
pub struct SessionMemory {
    /// Monotonically incremented once per turn, including short-circuits.
    pub turn_count: u64,
    /// Most recent turns, oldest first.
    pub history: VecDeque<TurnRecord>,
    /// Cached results keyed `turn_<n>`; entries are never overwritten.
    pub result_cache: HashMap<String, CachedResult>,
    /// Lexical markers seen so far; grows monotonically within a session.
    pub entity_index: BTreeSet<EntityKey>,
    /// Table referenced by the most recent successful query.
    pub last_table: Option<String>,
    /// Condensed text of recent turns, regenerated periodically.
    pub rolling_summary: String,
    /// Most recent classification result.
    pub last_topic: Option<String>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a completed turn into memory. Steps apply in order:
    /// count, history, cache + table tracking, entities, topic, summary.
    pub fn record_turn(&mut self, context: &mut SessionContext, turn: &TurnState) {
        self.turn_count += 1;

        self.history.push_back(TurnRecord {
            turn: self.turn_count,
            query_text: turn.user_text.clone(),
            generated_query: turn.generated_query.clone(),
            row_count: turn.rows.len(),
            timestamp: Utc::now(),
            response_preview: turn.answer.chars().take(PREVIEW_CHARS).collect(),
        });
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }

        if let Some(ref query) = turn.generated_query {
            if !turn.rows.is_empty() {
                let key = format!("turn_{}", self.turn_count);
                self.result_cache.entry(key).or_insert_with(|| CachedResult {
                    query: query.clone(),
                    rows: turn.rows.iter().take(CACHE_ROW_CAP).cloned().collect(),
                    total_row_count: turn.rows.len(),
                });

                if let Some(table) = table_from_query(query) {
                    self.last_table = Some(table.clone());
                    context.current_table = Some(table);
                }
            }
        }

        self.extract_entities(&turn.user_text, &turn.rows);

        self.last_topic = Some(turn.category.as_str().to_string());

        if self.turn_count % SUMMARY_INTERVAL == 0 {
            self.regenerate_summary();
            debug!(turn = self.turn_count, "Rolling summary regenerated");
        }
    }

    /// Retrieve the cached result for a turn, if one was stored.
    pub fn cached(&self, turn: u64) -> Option<&CachedResult> {
        self.result_cache.get(&format!("turn_{}", turn))
    }

    /// Add table mentions from the query text and proper names from the
    /// first few result rows. Insertion is idempotent.
    fn extract_entities(&mut self, query_text: &str, rows: &[parley_store::Record]) {
        let lower = query_text.to_lowercase();
        for table in TABLE_VOCABULARY {
            let spaced = table.replace('_', " ");
            if lower.contains(table) || lower.contains(&spaced) {
                self.entity_index.insert(EntityKey::Table(table.to_string()));
            }
        }

        for row in rows.iter().take(ENTITY_ROW_SCAN) {
            for (field, value) in &row.fields {
                if field.to_lowercase().contains("name") {
                    if let Value::String(text) = value {
                        if !text.is_empty() {
                            self.entity_index.insert(EntityKey::Name(text.clone()));
                        }
                    }
                }
            }
        }
    }

    /// Rebuild the rolling summary from the most recent turn records.
    fn regenerate_summary(&mut self) {
        let skip = self.history.len().saturating_sub(SUMMARY_WINDOW);
        let lines: Vec<String> = self
            .history
            .iter()
            .skip(skip)
            .map(|record| {
                let snippet: String = record.query_text.chars().take(60).collect();
                format!(
                    "Turn {}: Asked about '{}...' \u{2192} {} results",
                    record.turn, snippet, record.row_count
                )
            })
            .collect();
        self.rolling_summary = lines.join("\n");
    }
}
