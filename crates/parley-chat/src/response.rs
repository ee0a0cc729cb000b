//! Response shaping: rows in, user-facing text out.
//!
//! Deterministic field selection and labeling plus a size-tiered display
//! strategy. Composing a response also folds the turn into session memory;
//! the two always happen together, once per turn.

use serde_json::Value;
use tracing::debug;

use crate::memory::SessionMemory;
use crate::types::{SessionContext, TurnState};

/// The fixed message for turns that produced no rows.
pub const NO_RESULTS_MESSAGE: &str = "No results found for your query.";
/// Row counts up to this render in full for direct-display categories.
pub const FULL_DISPLAY_MAX: usize = 100;
/// Larger row sets show this many rows plus a truncation notice.
pub const SAMPLE_SIZE: usize = 20;

/// Fields rendered first when present, in priority order.
const PRIORITY_FIELDS: &[&str] = &[
    "hcp_name",
    "name",
    "system_name",
    "title",
    "specialty",
    "contact_name",
    "system_id",
    "hcp_id",
    "tier",
    "importance",
    "contact_email",
    "revenue",
    "phone",
    "address",
];

/// Surrogate and bookkeeping fields excluded from the fallback selection.
const HOUSEKEEPING_FIELDS: &[&str] = &["id", "created_at", "updated_at", "version_id"];

/// When no priority field matches, render the first N non-housekeeping fields.
const FALLBACK_FIELD_COUNT: usize = 5;

/// Explicit field-to-label table; anything else gets a title-cased,
/// underscores-to-spaces transform.
const FIELD_LABELS: &[(&str, &str)] = &[
    ("hcp_name", "Name"),
    ("name", "Name"),
    ("system_name", "System"),
    ("title", "Title"),
    ("specialty", "Specialty"),
    ("contact_name", "Contact"),
    ("system_id", "ID"),
    ("hcp_id", "HCP ID"),
    ("tier", "Tier"),
    ("importance", "Importance"),
    ("contact_email", "Email"),
    ("phone", "Phone"),
    ("address", "Address"),
    ("city", "City"),
    ("state", "State"),
    ("npi", "NPI"),
    ("revenue", "Revenue"),
    ("prescriber_type", "Type"),
];

/// Turns row sets into answers and applies the per-turn memory update.
#[derive(Debug, Default)]
pub struct ResponseComposer;

impl ResponseComposer {
    pub fn new() -> Self {
        Self
    }

    /// Compose the answer for a turn, then fold the turn into memory.
    ///
    /// The memory update always runs, including for short-circuited and
    /// failed turns, so the turn counter and history stay consistent.
    pub fn compose_and_record(
        &self,
        turn: &mut TurnState,
        memory: &mut SessionMemory,
        context: &mut SessionContext,
    ) -> String {
        let mut answer = self.compose(turn);

        if let Some(ref analysis) = turn.change_analysis {
            if !analysis.comparisons.is_empty() {
                answer.push_str("\n\n");
                answer.push_str(&analysis.render());
            }
        }

        turn.answer = answer.clone();
        memory.record_turn(context, turn);
        answer
    }

    /// Pure answer composition, without the memory side effect.
    pub fn compose(&self, turn: &TurnState) -> String {
        let rows = &turn.rows;

        if turn.category.is_direct_display() && !rows.is_empty() {
            if rows.len() <= FULL_DISPLAY_MAX {
                debug!(rows = rows.len(), "Rendering full result set");
                return format!(
                    "Here are all {} entries:\n\n{}",
                    rows.len(),
                    render_rows(rows)
                );
            }

            debug!(rows = rows.len(), sample = SAMPLE_SIZE, "Rendering sample");
            return format!(
                "Found {total} entries in total.\n\n\
                 Here are the first {sample}:\n\n\
                 {list}\n\n\
                 ... and {remaining} more entries.\n\n\
                 Would you like me to show a specific range or filter these results?",
                total = rows.len(),
                sample = SAMPLE_SIZE,
                list = render_rows(&rows[..SAMPLE_SIZE]),
                remaining = rows.len() - SAMPLE_SIZE,
            );
        }

        if !rows.is_empty() {
            return format!("Here are the results:\n\n{}", render_rows(rows));
        }

        NO_RESULTS_MESSAGE.to_string()
    }
}

/// Render rows 1-indexed, in store order, as `i. Label: value | ...` lines.
fn render_rows(rows: &[parley_store::Record]) -> String {
    let display_fields = select_display_fields(&rows[0]);

    let lines: Vec<String> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut parts: Vec<String> = display_fields
                .iter()
                .filter_map(|field| {
                    row.get(field)
                        .and_then(value_text)
                        .map(|text| format!("{}: {}", label_for(field), text))
                })
                .collect();

            // A row with nothing to show under the selected fields falls
            // back to all of its non-empty fields.
            if parts.is_empty() {
                parts = row
                    .fields
                    .iter()
                    .filter_map(|(field, value)| {
                        value_text(value).map(|text| format!("{}: {}", label_for(field), text))
                    })
                    .collect();
            }

            format!("{}. {}", i + 1, parts.join(" | "))
        })
        .collect();

    lines.join("\n")
}

/// Pick display fields from the first row: priority fields that exist, in
/// priority order, else the first few non-housekeeping fields.
fn select_display_fields(first: &parley_store::Record) -> Vec<String> {
    let names = first.field_names();

    let mut fields: Vec<String> = PRIORITY_FIELDS
        .iter()
        .copied()
        .filter(|p| names.contains(p))
        .map(|p| p.to_string())
        .collect();

    if fields.is_empty() {
        fields = names
            .iter()
            .copied()
            .filter(|n| !HOUSEKEEPING_FIELDS.contains(n))
            .take(FALLBACK_FIELD_COUNT)
            .map(|n| n.to_string())
            .collect();
    }

    fields
}

/// Human label for a field name.
fn label_for(field: &str) -> String {
    FIELD_LABELS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| title_case(field))
}

/// `underscore_name` -> `Underscore Name`.
fn title_case(field: &str) -> String {
    field
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A renderable non-empty value, or `None` for null/empty.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
