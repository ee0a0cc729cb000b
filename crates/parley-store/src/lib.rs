//! Parley store crate - the relational data store behind the chat pipeline.
//!
//! Provides the SQLite schema for the list-management dataset, a read-only
//! query executor with a structural allow-list guard, and version-history
//! change analysis.

pub mod db;
pub mod error;
pub mod executor;
pub mod guard;
pub mod migrations;
pub mod versions;

pub use db::Datastore;
pub use error::StoreError;
pub use executor::{QueryExecutor, Record};
pub use guard::ensure_single_select;
pub use versions::{ChangeAnalysis, MostDynamic, VersionComparison, VersionHistory, VersionRow};
