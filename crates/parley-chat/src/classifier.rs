//! Semantic query classification.
//!
//! Asks the completion engine to bucket a data-needing turn into a category
//! that steers query generation and answer formatting. Any failure or
//! unexpected output degrades to an opaque category; classification is never
//! fatal to a turn.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, warn};

use parley_llm::{CompletionEngine, CompletionOptions};

use crate::memory::SessionMemory;
use crate::types::{QueryCategory, SessionContext};

/// How many recent queries the classification prompt embeds.
const RECENT_QUERIES: usize = 3;
/// Truncation applied to each embedded query, in characters.
const QUERY_SNIPPET_CHARS: usize = 40;

/// Classifies turns via the completion engine.
pub struct QueryClassifier {
    engine: Arc<dyn CompletionEngine>,
    options: CompletionOptions,
}

impl QueryClassifier {
    pub fn new(engine: Arc<dyn CompletionEngine>, options: CompletionOptions) -> Self {
        Self { engine, options }
    }

    /// Bucket the turn into a semantic category.
    ///
    /// Callers short-circuit to [`QueryCategory::Conversation`] when the
    /// router decided no data is needed; this method is only invoked for
    /// data-needing turns.
    pub async fn classify(
        &self,
        user_text: &str,
        context: &SessionContext,
        memory: &SessionMemory,
    ) -> QueryCategory {
        let prompt = build_prompt(user_text, context, memory);

        match self.engine.complete(&prompt, &self.options).await {
            Ok(raw) => {
                let category = QueryCategory::parse(&raw);
                debug!(category = category.as_str(), "Query classified");
                category
            }
            Err(e) => {
                warn!(error = %e, "Classification failed; using opaque category");
                QueryCategory::Other("unknown".to_string())
            }
        }
    }
}

fn build_prompt(user_text: &str, context: &SessionContext, memory: &SessionMemory) -> String {
    let mut recent = String::new();
    let records: Vec<_> = memory.history.iter().rev().take(RECENT_QUERIES).collect();
    if !records.is_empty() {
        let snippets: Vec<String> = records
            .iter()
            .rev()
            .map(|r| r.query_text.chars().take(QUERY_SNIPPET_CHARS).collect())
            .collect();
        let _ = write!(recent, "Recent queries: {}", snippets.join(", "));
    }

    format!(
        "Classify the following user query into one of:\n\
         - version_comparison (comparing versions)\n\
         - history (timeline/evolution)\n\
         - attribution (who made the changes)\n\
         - current_state (current version or active state)\n\
         - list_all (listing all records from a table)\n\
         - ad_hoc_select (any general or SQL-like query)\n\
         \n\
         Current context: {}\n\
         {}\n\
         \n\
         Query: {}\n\
         \n\
         Return only one word category.",
        context.current_table.as_deref().unwrap_or("unknown"),
        recent,
        user_text
    )
}

#[cfg(test)]
mod tests {
    use parley_llm::ScriptedCompletion;

    use super::*;
    use crate::types::{QueryCategory, RouteDecision, RouteSignals, TurnState};

    fn classifier(engine: ScriptedCompletion) -> QueryClassifier {
        QueryClassifier::new(
            Arc::new(engine),
            CompletionOptions {
                temperature: 0.0,
                max_output_tokens: 10,
            },
        )
    }

    fn memory_with_history(queries: &[&str]) -> SessionMemory {
        let mut memory = SessionMemory::new();
        let mut ctx = SessionContext::default();
        for q in queries {
            let decision = RouteDecision {
                needs_data: true,
                mentioned_tables: vec![],
                signals: RouteSignals::default(),
            };
            let turn = TurnState::new(q, &decision);
            memory.record_turn(&mut ctx, &turn);
        }
        memory
    }

    #[tokio::test]
    async fn test_classify_known_category() {
        let c = classifier(ScriptedCompletion::new(["list_all"]));
        let category = c
            .classify("show everything", &SessionContext::default(), &SessionMemory::new())
            .await;
        assert_eq!(category, QueryCategory::ListAll);
    }

    #[tokio::test]
    async fn test_classify_trims_and_lowercases() {
        let c = classifier(ScriptedCompletion::new(["  Version_Comparison\n"]));
        let category = c
            .classify("compare v1 and v2", &SessionContext::default(), &SessionMemory::new())
            .await;
        assert_eq!(category, QueryCategory::VersionComparison);
    }

    #[tokio::test]
    async fn test_unknown_output_passes_through() {
        let c = classifier(ScriptedCompletion::new(["made_up_bucket"]));
        let category = c
            .classify("anything", &SessionContext::default(), &SessionMemory::new())
            .await;
        assert_eq!(category, QueryCategory::Other("made_up_bucket".to_string()));
        assert!(!category.is_direct_display());
    }

    #[tokio::test]
    async fn test_engine_failure_degrades_to_unknown() {
        let c = classifier(ScriptedCompletion::failing("timeout"));
        let category = c
            .classify("anything", &SessionContext::default(), &SessionMemory::new())
            .await;
        assert_eq!(category, QueryCategory::Other("unknown".to_string()));
    }

    #[test]
    fn test_prompt_embeds_context_and_history() {
        let memory = memory_with_history(&[
            "first question about versions",
            "second question about the list history",
        ]);
        let mut ctx = SessionContext::default();
        ctx.current_table = Some("list_versions".to_string());

        let prompt = build_prompt("how did it evolve", &ctx, &memory);
        assert!(prompt.contains("Current context: list_versions"));
        assert!(prompt.contains("first question about versions"));
        assert!(prompt.contains("how did it evolve"));
    }

    #[test]
    fn test_prompt_truncates_embedded_queries() {
        let long = "q".repeat(120);
        let memory = memory_with_history(&[&long]);
        let prompt = build_prompt("next", &SessionContext::default(), &memory);
        assert!(prompt.contains(&"q".repeat(40)));
        assert!(!prompt.contains(&"q".repeat(41)));
    }

    #[test]
    fn test_prompt_limits_to_three_recent_queries() {
        let memory = memory_with_history(&["alpha", "bravo", "charlie", "delta", "echo"]);
        let prompt = build_prompt("next", &SessionContext::default(), &memory);
        assert!(!prompt.contains("alpha"));
        assert!(!prompt.contains("bravo"));
        assert!(prompt.contains("charlie"));
        assert!(prompt.contains("delta"));
        assert!(prompt.contains("echo"));
    }
}
