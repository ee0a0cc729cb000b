//! Datastore handle with per-call scoped connections.
//!
//! Unlike a pooled design, every operation opens its own connection for the
//! duration of the call and closes it on drop. One turn never holds a
//! connection across a suspension point.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;
use crate::migrations;

/// Handle to the SQLite data store.
///
/// Cloning is cheap; the handle carries only the path and the busy timeout
/// applied to each scoped connection.
#[derive(Debug, Clone)]
pub struct Datastore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Datastore {
    /// Create a handle for the database at `path`.
    pub fn new(path: &Path, busy_timeout: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            busy_timeout,
        }
    }

    /// Ensure the schema exists, creating the database file if needed.
    pub fn initialize(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Connection(format!("failed to create data dir: {}", e)))?;
        }
        let conn = self.open_scoped()?;
        migrations::run_migrations(&conn)?;
        info!("Datastore initialized at {}", self.path.display());
        Ok(())
    }

    /// Open a connection scoped to a single call.
    ///
    /// WAL mode allows concurrent readers; the busy timeout bounds waiting
    /// on a writer instead of failing immediately.
    pub fn open_scoped(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)
            .map_err(|e| StoreError::Connection(format!("failed to open database: {}", e)))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| StoreError::Connection(format!("failed to set busy timeout: {}", e)))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| StoreError::Connection(format!("failed to set pragmas: {}", e)))?;
        Ok(conn)
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
