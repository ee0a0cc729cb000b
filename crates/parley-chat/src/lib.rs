//! Conversational query front-end for the list-management dataset.
//!
//! Turns a free-text question into a data-fetch decision, a generated
//! read-only query, and a formatted answer, remembering prior turns per
//! session. The turn pipeline is: intent routing, classification, query
//! composition, execution, response shaping, memory update.

pub mod classifier;
pub mod composer;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod response;
pub mod router;
pub mod schema;
pub mod types;

pub use classifier::QueryClassifier;
pub use composer::QueryComposer;
pub use error::ChatError;
pub use memory::SessionMemory;
pub use orchestrator::{Orchestrator, SessionStats};
pub use response::ResponseComposer;
pub use router::IntentRouter;
pub use schema::SCHEMA_DESCRIPTION;
pub use types::{
    CachedResult, EntityKey, QueryCategory, RouteDecision, RouteSignals, SessionContext,
    TranscriptMessage, TurnOutcome, TurnRecord, TurnState,
};
