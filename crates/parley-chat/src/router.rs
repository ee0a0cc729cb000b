//! Intent routing: does this turn need a data fetch at all?
//!
//! Pure lexical policy over the user text plus the session's entity index.
//! Deliberately permissive: everything that is not a pure greeting or a
//! meta question about the assistant re-queries the data store.

use tracing::debug;

use crate::memory::SessionMemory;
use crate::types::{RouteDecision, RouteSignals, SessionContext, TABLE_VOCABULARY};

/// Utterances that are greetings and nothing else (exact match after
/// trimming and lowercasing).
const PURE_GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "thanks",
    "thank you",
    "bye",
    "good morning",
    "good evening",
];

/// Questions about the assistant itself (substring match).
const META_PHRASES: &[&str] = &[
    "how do you work",
    "what can you do",
    "help me",
    "how does this work",
];

/// Strong indicators of a fresh data request. Advisory only.
const NEW_QUERY_INDICATORS: &[&str] = &[
    "give me",
    "show me",
    "retrieve",
    "fetch",
    "get me",
    "find",
    "i want",
    "i need",
    "can you get",
    "can you show",
    "list",
    "another question",
    "new question",
    "different question",
    "from table",
    "from the",
    "select",
    "query",
    "what are",
    "what is",
];

/// Indicators of a follow-up or clarification. Advisory only.
const FOLLOW_UP_INDICATORS: &[&str] = &[
    "about them",
    "about these",
    "about those",
    "about it",
    "about that",
    "the same",
    "those ones",
    "these ones",
    "from that",
    "from those",
    "tell me more",
    "more about",
    "more details",
    "more info",
    "what about",
    "how about",
    "why",
    "explain",
];

/// References to previously returned results. Advisory only.
const PRIOR_RESULT_INDICATORS: &[&str] = &[
    "the results",
    "the data",
    "those results",
    "that list",
    "the previous",
    "last query",
    "before",
    "earlier",
];

/// Lexical intent router.
///
/// Stateless; kept as a value so the policy can be swapped for a learned
/// classifier without touching the orchestrator's control flow.
#[derive(Debug, Default)]
pub struct IntentRouter;

impl IntentRouter {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether the turn needs a data fetch.
    ///
    /// Priority: pure greeting, then meta question, then an entity-index hit
    /// forcing a fetch, then the permissive default. Also scans the table
    /// vocabulary and folds mentions into the session context (last match
    /// wins for `current_table`).
    pub fn route(
        &self,
        user_text: &str,
        memory: &SessionMemory,
        context: &mut SessionContext,
    ) -> RouteDecision {
        let lower = user_text.trim().to_lowercase();

        let entity_match = memory.entity_index.iter().any(|key| {
            let value = key.value().to_lowercase();
            !value.is_empty() && lower.contains(&value)
        });

        let signals = RouteSignals {
            looks_like_new_query: contains_any(&lower, NEW_QUERY_INDICATORS),
            looks_like_follow_up: contains_any(&lower, FOLLOW_UP_INDICATORS),
            references_prior_results: contains_any(&lower, PRIOR_RESULT_INDICATORS),
            entity_match,
        };

        // Entity hits and the permissive default both re-query; only pure
        // greetings and meta questions short-circuit the pipeline.
        let needs_data = !(PURE_GREETINGS.contains(&lower.as_str())
            || contains_any(&lower, META_PHRASES));

        let mentioned = scan_tables(&lower, context);

        debug!(
            needs_data,
            entity_match,
            mentioned = mentioned.len(),
            "Route decision"
        );

        RouteDecision {
            needs_data,
            mentioned_tables: mentioned,
            signals,
        }
    }
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase))
}

/// Record table-vocabulary mentions into the context; returns the matches.
///
/// Matches both the raw table name and its underscores-as-spaces form, so
/// "target list entries" hits `target_list_entries`.
fn scan_tables(lower: &str, context: &mut SessionContext) -> Vec<String> {
    let mut mentioned = Vec::new();
    for table in TABLE_VOCABULARY {
        let spaced = table.replace('_', " ");
        if lower.contains(table) || lower.contains(&spaced) {
            if !context.mentioned_tables.iter().any(|t| t == table) {
                context.mentioned_tables.push(table.to_string());
            }
            context.current_table = Some(table.to_string());
            mentioned.push(table.to_string());
        }
    }
    mentioned
}
