//! Parley application binary - composition root.
//!
//! Ties the workspace crates together:
//! 1. Load configuration from TOML (with CLI/env overrides)
//! 2. Initialize the SQLite data store
//! 3. Build the completion engine client
//! 4. Wire the turn orchestrator
//! 5. Start the axum REST API server

mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use parley_api::{start_server, AppState};
use parley_chat::Orchestrator;
use parley_core::config::ParleyConfig;
use parley_core::error::Result;
use parley_llm::{CompletionEngine, OpenAiCompletion};
use parley_store::Datastore;

use cli::CliArgs;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    if let Err(e) = run(args).await {
        eprintln!("parley: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.resolve_config_path();
    let mut config = ParleyConfig::load_or_default(&config_path);

    if let Some(db_path) = args.resolve_db_path() {
        config.store.db_path = db_path;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    let port = args.resolve_port(config.general.port);

    init_tracing(&config.general.log_level);
    tracing::info!("Parley starting (config: {})", config_path.display());

    let db_path = expand_home(&config.store.db_path);
    let store = Datastore::new(
        &db_path,
        Duration::from_millis(config.store.busy_timeout_ms),
    );
    store.initialize()?;

    let engine: Arc<dyn CompletionEngine> = Arc::new(OpenAiCompletion::from_config(&config.llm)?);

    let orchestrator = Orchestrator::new(engine, store, &config);
    let state = AppState::new(orchestrator);

    start_server(port, state).await
}

/// Initialize the tracing subscriber once, honoring RUST_LOG when set.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={0},tower_http={0}", log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}
