//! Version-history change analysis.
//!
//! Diffs entry membership between consecutive versions of a list request to
//! report additions, removals, and the most dynamic version.

use std::collections::HashSet;

use tracing::debug;

use crate::db::Datastore;
use crate::error::StoreError;

/// One version row of a list request.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRow {
    pub version_id: i64,
    pub version_number: i64,
    pub created_at: i64,
}

/// Entry-membership diff between two consecutive versions.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionComparison {
    pub from_version: i64,
    pub to_version: i64,
    pub added: usize,
    pub removed: usize,
    pub total: usize,
}

/// The version with the largest total churn.
#[derive(Debug, Clone, PartialEq)]
pub struct MostDynamic {
    pub version_number: i64,
    pub total: usize,
}

/// Full change analysis across a request's version history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeAnalysis {
    pub comparisons: Vec<VersionComparison>,
    pub most_dynamic: Option<MostDynamic>,
}

impl ChangeAnalysis {
    /// Render the analysis as an answer-ready text block.
    pub fn render(&self) -> String {
        let mut lines = vec!["Version changes:".to_string()];
        for c in &self.comparisons {
            lines.push(format!(
                "- v{} -> v{}: {} added, {} removed",
                c.from_version, c.to_version, c.added, c.removed
            ));
        }
        if let Some(ref m) = self.most_dynamic {
            lines.push(format!(
                "Most dynamic version: v{} ({} changes)",
                m.version_number, m.total
            ));
        }
        lines.join("\n")
    }
}

/// Fetches and analyzes version history for list requests.
#[derive(Debug, Clone)]
pub struct VersionHistory {
    store: Datastore,
}

impl VersionHistory {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    /// Fetch the versions of a request, ordered by version number.
    pub fn fetch_versions(&self, request_id: i64) -> Result<Vec<VersionRow>, StoreError> {
        let conn = self.store.open_scoped()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, version_number, created_at
                 FROM list_versions
                 WHERE request_id = ?1
                 ORDER BY version_number ASC",
            )
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let rows = stmt
            .query_map([request_id], |row| {
                Ok(VersionRow {
                    version_id: row.get(0)?,
                    version_number: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })
            .map_err(|e| StoreError::Query(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))?;

        debug!(request_id, versions = rows.len(), "Fetched version history");
        Ok(rows)
    }

    /// Diff entry membership between each pair of consecutive versions.
    pub fn analyze_changes(&self, versions: &[VersionRow]) -> Result<ChangeAnalysis, StoreError> {
        if versions.len() < 2 {
            return Ok(ChangeAnalysis::default());
        }

        let conn = self.store.open_scoped()?;
        let mut comparisons = Vec::new();
        let mut most_dynamic: Option<MostDynamic> = None;

        let mut prev = entry_ids(&conn, versions[0].version_id)?;
        for pair in versions.windows(2) {
            let curr = entry_ids(&conn, pair[1].version_id)?;

            let added = curr.difference(&prev).count();
            let removed = prev.difference(&curr).count();
            let total = added + removed;

            comparisons.push(VersionComparison {
                from_version: pair[0].version_number,
                to_version: pair[1].version_number,
                added,
                removed,
                total,
            });

            if most_dynamic.as_ref().is_none_or(|m| total > m.total) {
                most_dynamic = Some(MostDynamic {
                    version_number: pair[1].version_number,
                    total,
                });
            }

            prev = curr;
        }

        Ok(ChangeAnalysis {
            comparisons,
            most_dynamic,
        })
    }

    /// Fetch and analyze in one step; the usual entry point for the pipeline.
    pub fn analyze_request(&self, request_id: i64) -> Result<ChangeAnalysis, StoreError> {
        let versions = self.fetch_versions(request_id)?;
        self.analyze_changes(&versions)
    }
}

fn entry_ids(
    conn: &rusqlite::Connection,
    version_id: i64,
) -> Result<HashSet<String>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT hcp_id FROM target_list_entries WHERE version_id = ?1")
        .map_err(|e| StoreError::Query(e.to_string()))?;
    let ids = stmt
        .query_map([version_id], |row| row.get::<_, String>(0))
        .map_err(|e| StoreError::Query(e.to_string()))?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(|e| StoreError::Query(e.to_string()))?;
    Ok(ids)
}
