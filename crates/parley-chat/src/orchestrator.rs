//! Turn orchestrator: sequences routing, classification, composition,
//! execution, and response shaping, and owns the session registry.
//!
//! One turn is processed end to end before the next begins on the same
//! session key; turns on different keys proceed independently. No internal
//! pipeline failure escapes `process_turn`: every stage degrades to an
//! empty/default value and the turn still yields a well-formed answer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use parley_core::config::ParleyConfig;
use parley_llm::{BoundedCompletion, CompletionEngine, CompletionOptions};
use parley_store::{Datastore, QueryExecutor, VersionHistory};

use crate::classifier::QueryClassifier;
use crate::composer::QueryComposer;
use crate::error::ChatError;
use crate::memory::SessionMemory;
use crate::response::ResponseComposer;
use crate::router::IntentRouter;
use crate::schema::SCHEMA_DESCRIPTION;
use crate::types::{
    QueryCategory, SessionContext, TranscriptMessage, TurnOutcome, TurnState,
};

/// Transcript keeps at most this many messages (user + assistant).
const TRANSCRIPT_CAP: usize = 20;

/// A session's mutable state, guarded by the per-session turn lock.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub memory: SessionMemory,
    pub context: SessionContext,
    pub transcript: Vec<TranscriptMessage>,
}

/// One registry slot; the tokio mutex serializes turns on the session key.
struct SessionSlot {
    state: tokio::sync::Mutex<SessionState>,
}

/// Read-only orchestrator statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub active_sessions: usize,
}

/// The turn-processing pipeline and session registry.
pub struct Orchestrator {
    router: IntentRouter,
    classifier: QueryClassifier,
    composer: QueryComposer,
    response: ResponseComposer,
    executor: QueryExecutor,
    versions: VersionHistory,
    schema: String,
    enabled: bool,
    max_message_length: usize,
    sessions: Mutex<HashMap<String, Arc<SessionSlot>>>,
}

impl Orchestrator {
    /// Wire the pipeline from an injected completion engine and data store.
    ///
    /// Both completion stages share one engine, bounded by the configured
    /// per-call timeout.
    pub fn new(engine: Arc<dyn CompletionEngine>, store: Datastore, config: &ParleyConfig) -> Self {
        let bounded: Arc<dyn CompletionEngine> = Arc::new(BoundedCompletion::new(
            engine,
            Duration::from_secs(config.llm.request_timeout_secs),
        ));

        let classifier = QueryClassifier::new(
            Arc::clone(&bounded),
            CompletionOptions {
                temperature: config.llm.temperature,
                max_output_tokens: config.llm.classify_max_tokens,
            },
        );
        let composer = QueryComposer::new(
            Arc::clone(&bounded),
            CompletionOptions {
                temperature: config.llm.temperature,
                max_output_tokens: config.llm.compose_max_tokens,
            },
        );

        Self {
            router: IntentRouter::new(),
            classifier,
            composer,
            response: ResponseComposer::new(),
            executor: QueryExecutor::new(store.clone()),
            versions: VersionHistory::new(store),
            schema: SCHEMA_DESCRIPTION.to_string(),
            enabled: config.chat.enabled,
            max_message_length: config.chat.max_message_length,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the schema description handed to the composer.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Process one turn for a session.
    ///
    /// Creates the session on first use. Only message validation returns an
    /// error; every downstream failure degrades into the answer text.
    pub async fn process_turn(
        &self,
        session_key: &str,
        user_text: &str,
        request_id: Option<i64>,
    ) -> Result<TurnOutcome, ChatError> {
        if !self.enabled {
            return Err(ChatError::Disabled);
        }
        if user_text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if user_text.len() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }

        let slot = self.slot(session_key)?;
        let mut state = slot.state.lock().await;

        if request_id.is_some() {
            state.context.active_request_id = request_id;
        }

        let SessionState {
            memory,
            context,
            transcript,
        } = &mut *state;

        let decision = self.router.route(user_text, memory, context);
        let mut turn = TurnState::new(user_text, &decision);

        if turn.needs_data {
            turn.category = self.classifier.classify(user_text, context, memory).await;
            context.last_query_type = Some(turn.category.as_str().to_string());

            turn.generated_query = self
                .composer
                .compose(user_text, context, memory, &self.schema)
                .await;

            if let Some(ref query) = turn.generated_query {
                context.last_composed_query = Some(query.clone());
                match self.executor.run(query) {
                    Ok(rows) => {
                        context.last_results_summary = format!("Retrieved {} rows", rows.len());
                        context.last_result_count = rows.len();
                        turn.rows = rows;
                    }
                    Err(e) => {
                        warn!(error = %e, "Query execution failed; continuing with no rows");
                        context.last_results_summary = format!("Error: {}", e);
                        context.last_result_count = 0;
                    }
                }
            }

            if turn.category == QueryCategory::VersionComparison {
                if let Some(rid) = context.active_request_id {
                    match self.versions.analyze_request(rid) {
                        Ok(analysis) => turn.change_analysis = Some(analysis),
                        Err(e) => {
                            warn!(error = %e, request_id = rid, "Version analysis failed")
                        }
                    }
                }
            }
        }

        let answer = self
            .response
            .compose_and_record(&mut turn, memory, context);

        transcript.push(TranscriptMessage {
            role: "user".to_string(),
            content: user_text.to_string(),
            category: Some(turn.category.as_str().to_string()),
        });
        transcript.push(TranscriptMessage {
            role: "assistant".to_string(),
            content: answer.clone(),
            category: Some(turn.category.as_str().to_string()),
        });
        if transcript.len() > TRANSCRIPT_CAP {
            let excess = transcript.len() - TRANSCRIPT_CAP;
            transcript.drain(..excess);
        }

        debug!(
            session = session_key,
            turn = memory.turn_count,
            rows = turn.rows.len(),
            category = turn.category.as_str(),
            "Turn processed"
        );

        Ok(TurnOutcome {
            answer,
            generated_query: turn.generated_query,
            row_count: turn.rows.len(),
            category: Some(turn.category.as_str().to_string()),
        })
    }

    /// Drop a session. Clearing an unknown key is not an error.
    pub fn clear_session(&self, session_key: &str) -> Result<bool, ChatError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ChatError::Registry(format!("session map lock poisoned: {}", e)))?;
        let removed = sessions.remove(session_key).is_some();
        if removed {
            info!(session = session_key, "Session cleared");
        }
        Ok(removed)
    }

    /// Active session count for health reporting.
    pub fn stats(&self) -> SessionStats {
        let active = self.sessions.lock().map(|s| s.len()).unwrap_or(0);
        SessionStats {
            active_sessions: active,
        }
    }

    /// Snapshot a session's state, if the key exists.
    pub async fn session_state(&self, session_key: &str) -> Option<SessionState> {
        let slot = {
            let sessions = self.sessions.lock().ok()?;
            sessions.get(session_key).cloned()
        }?;
        let state = slot.state.lock().await;
        Some(state.clone())
    }

    /// Get or create the registry slot for a key.
    ///
    /// The map lock is held only for the lookup/insert; the per-session turn
    /// lock is acquired afterwards, so distinct keys never contend.
    fn slot(&self, session_key: &str) -> Result<Arc<SessionSlot>, ChatError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ChatError::Registry(format!("session map lock poisoned: {}", e)))?;
        let slot = sessions
            .entry(session_key.to_string())
            .or_insert_with(|| {
                info!(session = session_key, "Session created");
                Arc::new(SessionSlot {
                    state: tokio::sync::Mutex::new(SessionState::default()),
                })
            });
        Ok(Arc::clone(slot))
    }
}

// =============================================================================
// Tests
// =============================================================================
