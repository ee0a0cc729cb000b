//! HTTP surface for the conversational query front-end.
//!
//! Exposes the turn entry point, session clearing, and health introspection
//! over axum. All pipeline failures are absorbed below this layer; the only
//! errors surfaced here are malformed requests.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
