//! Query composition from user text plus session context.
//!
//! Builds a structured context packet out of session memory and asks the
//! completion engine for a single read-only statement consistent with it.
//! The composer does not validate the returned text against a grammar; the
//! structural check is the executor's responsibility.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, warn};

use parley_llm::{CompletionEngine, CompletionOptions};

use crate::memory::{table_from_query, SessionMemory};
use crate::types::SessionContext;

/// How many recent turn records the context packet embeds.
const CONTEXT_TURNS: usize = 5;
/// How many entity labels the context packet embeds.
const CONTEXT_ENTITIES: usize = 10;
/// Marker used in place of a rolling summary on the first turns.
const FIRST_QUERY_MARKER: &str = "First query in session";

/// Composes data-store queries via the completion engine.
pub struct QueryComposer {
    engine: Arc<dyn CompletionEngine>,
    options: CompletionOptions,
}

impl QueryComposer {
    pub fn new(engine: Arc<dyn CompletionEngine>, options: CompletionOptions) -> Self {
        Self { engine, options }
    }

    /// Produce a query for a data-needing turn.
    ///
    /// Returns `None` when the engine fails or returns empty output; the
    /// pipeline then proceeds straight to the no-results response.
    pub async fn compose(
        &self,
        user_text: &str,
        context: &SessionContext,
        memory: &SessionMemory,
        schema_description: &str,
    ) -> Option<String> {
        let prompt = build_prompt(user_text, context, memory, schema_description);

        match self.engine.complete(&prompt, &self.options).await {
            Ok(raw) => {
                let cleaned = strip_fences(&raw);
                if cleaned.is_empty() {
                    warn!("Composer returned empty output; no query generated");
                    None
                } else {
                    debug!(query = %cleaned, "Query composed");
                    Some(cleaned)
                }
            }
            Err(e) => {
                warn!(error = %e, "Query composition failed; no query generated");
                None
            }
        }
    }
}

/// The most recent turn that actually generated a query, if any.
fn latest_generated(memory: &SessionMemory) -> Option<(&str, &str)> {
    memory
        .history
        .iter()
        .rev()
        .find_map(|record| {
            record
                .generated_query
                .as_deref()
                .map(|query| (record.query_text.as_str(), query))
        })
}

fn build_prompt(
    user_text: &str,
    context: &SessionContext,
    memory: &SessionMemory,
    schema_description: &str,
) -> String {
    let mut packet = String::new();

    let _ = writeln!(
        packet,
        "Current table/topic: {}",
        context.current_table.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(
        packet,
        "Last table queried: {}",
        memory.last_table.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(
        packet,
        "Previously mentioned tables: {}",
        context.mentioned_tables.join(", ")
    );

    let skip = memory.history.len().saturating_sub(CONTEXT_TURNS);
    if memory.history.len() > skip {
        let _ = writeln!(packet, "\nRecent queries in this conversation:");
        for record in memory.history.iter().skip(skip) {
            let snippet: String = record.query_text.chars().take(80).collect();
            let _ = writeln!(packet, "- Turn {}: {}", record.turn, snippet);
            if let Some(ref query) = record.generated_query {
                let q: String = query.chars().take(100).collect();
                let _ = writeln!(packet, "  Query: {}", q);
            }
        }
    }

    // The anaphora-resolution target: the most recent generated query.
    let anaphora_table = latest_generated(memory)
        .and_then(|(_, query)| table_from_query(query))
        .or_else(|| memory.last_table.clone());
    if let Some((text, query)) = latest_generated(memory) {
        let _ = writeln!(
            packet,
            "\nMost recent query (primary context):\n\
             User asked: \"{}\"\n\
             Query executed: {}\n\
             Table used: {}\n\
             If the current question refers to \"them\", \"those entries\", \
             \"full entry\", or \"more details\", it means the results of \
             that query.",
            text,
            query,
            anaphora_table.as_deref().unwrap_or("unknown")
        );
    }

    if !memory.entity_index.is_empty() {
        let labels: Vec<String> = memory
            .entity_index
            .iter()
            .take(CONTEXT_ENTITIES)
            .map(|key| key.label())
            .collect();
        let _ = writeln!(packet, "\nMentioned entities: {}", labels.join(", "));
    }

    let summary = if memory.rolling_summary.is_empty() {
        FIRST_QUERY_MARKER
    } else {
        memory.rolling_summary.as_str()
    };

    format!(
        "You are an expert SQL generator for a SQLite database.\n\
         \n\
         Database schema:\n{schema}\n\
         \n\
         Conversation context:\n{packet}\n\
         Conversation summary:\n{summary}\n\
         \n\
         Current user question: {question}\n\
         \n\
         Instructions:\n\
         1. Generate a single read-only SELECT statement. No INSERT, UPDATE, \
         DELETE, or DDL.\n\
         2. If the question mentions a person name seen in recent results, or \
         says \"give details for X\" or \"full entry\" or \"more details\", \
         query the same table as the most recent query ({anaphora}) and add a \
         WHERE filter instead of switching tables.\n\
         3. If the question references \"them\", \"those\", or \"the previous \
         ones\", use {anaphora}.\n\
         4. Use LIKE '%name%' for flexible name matching.\n\
         5. Return the bare SQL text only. No explanations, no markdown, no \
         code blocks.",
        schema = schema_description,
        packet = packet,
        summary = summary,
        question = user_text,
        anaphora = anaphora_table.as_deref().unwrap_or("the most recent table"),
    )
}

/// Strip markdown code fences and a leading language tag from engine output.
fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if text.starts_with("```") {
        text = text.trim_start_matches("```");
        if let Some(rest) = text.strip_prefix("sql") {
            text = rest;
        }
        if let Some(end) = text.rfind("```") {
            text = &text[..end];
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QueryCategory, RouteDecision, RouteSignals, TurnState};
    use parley_llm::ScriptedCompletion;

    fn composer(engine: ScriptedCompletion) -> QueryComposer {
        QueryComposer::new(
            Arc::new(engine),
            CompletionOptions {
                temperature: 0.0,
                max_output_tokens: 400,
            },
        )
    }

    fn memory_after_query(text: &str, query: &str, rows: usize) -> SessionMemory {
        let mut memory = SessionMemory::new();
        let mut ctx = SessionContext::default();
        let decision = RouteDecision {
            needs_data: true,
            mentioned_tables: vec![],
            signals: RouteSignals::default(),
        };
        let mut turn = TurnState::new(text, &decision);
        turn.category = QueryCategory::ListAll;
        turn.generated_query = Some(query.to_string());
        turn.rows = (0..rows)
            .map(|i| parley_store::Record {
                fields: vec![(
                    "hcp_name".to_string(),
                    serde_json::json!(format!("Dr. {}", i)),
                )],
            })
            .collect();
        turn.answer = "rows rendered".to_string();
        memory.record_turn(&mut ctx, &turn);
        memory
    }

    // ---- Compose outcomes ----

    #[tokio::test]
    async fn test_compose_returns_query() {
        let c = composer(ScriptedCompletion::new([
            "SELECT * FROM target_list_entries",
        ]));
        let query = c
            .compose(
                "show all entries",
                &SessionContext::default(),
                &SessionMemory::new(),
                "schema here",
            )
            .await;
        assert_eq!(query.as_deref(), Some("SELECT * FROM target_list_entries"));
    }

    #[tokio::test]
    async fn test_compose_failure_returns_none() {
        let c = composer(ScriptedCompletion::failing("quota"));
        let query = c
            .compose(
                "show all entries",
                &SessionContext::default(),
                &SessionMemory::new(),
                "schema",
            )
            .await;
        assert!(query.is_none());
    }

    #[tokio::test]
    async fn test_compose_empty_output_returns_none() {
        let c = composer(ScriptedCompletion::new(["   "]));
        let query = c
            .compose(
                "show all entries",
                &SessionContext::default(),
                &SessionMemory::new(),
                "schema",
            )
            .await;
        assert!(query.is_none());
    }

    #[tokio::test]
    async fn test_compose_strips_markdown_fences() {
        let c = composer(ScriptedCompletion::new([
            "```sql\nSELECT hcp_name FROM target_list_entries\n```",
        ]));
        let query = c
            .compose(
                "names please",
                &SessionContext::default(),
                &SessionMemory::new(),
                "schema",
            )
            .await;
        assert_eq!(
            query.as_deref(),
            Some("SELECT hcp_name FROM target_list_entries")
        );
    }

    // ---- Prompt construction ----

    #[test]
    fn test_prompt_includes_schema_and_question() {
        let prompt = build_prompt(
            "how many entries",
            &SessionContext::default(),
            &SessionMemory::new(),
            "TABLE target_list_entries (...)",
        );
        assert!(prompt.contains("TABLE target_list_entries"));
        assert!(prompt.contains("Current user question: how many entries"));
    }

    #[test]
    fn test_prompt_first_query_marker_without_summary() {
        let prompt = build_prompt(
            "q",
            &SessionContext::default(),
            &SessionMemory::new(),
            "schema",
        );
        assert!(prompt.contains(FIRST_QUERY_MARKER));
    }

    #[test]
    fn test_prompt_highlights_most_recent_query() {
        let memory = memory_after_query(
            "show me target list entries",
            "SELECT * FROM target_list_entries",
            3,
        );
        let prompt = build_prompt("give details for Dr. 1", &SessionContext::default(), &memory, "schema");
        assert!(prompt.contains("Most recent query (primary context):"));
        assert!(prompt.contains("User asked: \"show me target list entries\""));
        assert!(prompt.contains("Query executed: SELECT * FROM target_list_entries"));
        assert!(prompt.contains("Table used: target_list_entries"));
        // Anaphora instructions name the same table.
        assert!(prompt.contains("the most recent query (target_list_entries)"));
    }

    #[test]
    fn test_prompt_lists_entities_capped() {
        let mut memory = SessionMemory::new();
        for i in 0..15 {
            memory
                .entity_index
                .insert(crate::types::EntityKey::Name(format!("Person {:02}", i)));
        }
        let prompt = build_prompt("q", &SessionContext::default(), &memory, "schema");
        let count = prompt.matches("name_Person").count();
        assert_eq!(count, CONTEXT_ENTITIES);
    }

    #[test]
    fn test_prompt_uses_rolling_summary_when_present() {
        let mut memory = SessionMemory::new();
        memory.rolling_summary = "Turn 3: Asked about 'x...' \u{2192} 2 results".to_string();
        let prompt = build_prompt("q", &SessionContext::default(), &memory, "schema");
        assert!(prompt.contains("Turn 3: Asked about"));
        assert!(!prompt.contains(FIRST_QUERY_MARKER));
    }

    #[test]
    fn test_prompt_embeds_recent_turns_with_queries() {
        let memory = memory_after_query("list versions", "SELECT * FROM list_versions", 2);
        let prompt = build_prompt("next", &SessionContext::default(), &memory, "schema");
        assert!(prompt.contains("- Turn 1: list versions"));
        assert!(prompt.contains("  Query: SELECT * FROM list_versions"));
    }

    // ---- Fence stripping ----

    #[test]
    fn test_strip_fences_plain_text_untouched() {
        assert_eq!(strip_fences(" SELECT 1 "), "SELECT 1");
    }

    #[test]
    fn test_strip_fences_without_language_tag() {
        assert_eq!(strip_fences("```\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn test_strip_fences_with_sql_tag() {
        assert_eq!(strip_fences("```sql\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn test_strip_fences_unterminated() {
        assert_eq!(strip_fences("```sql\nSELECT 1"), "SELECT 1");
    }
}
