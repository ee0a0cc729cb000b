//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use parley_chat::Orchestrator;

/// Shared application state.
///
/// The orchestrator handles its own per-session locking; handlers only need
/// a cheaply clonable reference.
#[derive(Clone)]
pub struct AppState {
    /// The turn-processing pipeline and session registry.
    pub orchestrator: Arc<Orchestrator>,
    /// Server start time for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            start_time: Instant::now(),
        }
    }
}
