//! Read-only query executor.
//!
//! Runs one guarded statement per call against a scoped connection and maps
//! every row to a uniform ordered-field record. Execution failures are
//! values, not panics; the turn pipeline downgrades them to empty row sets.

use rusqlite::types::ValueRef;
use serde_json::Value;
use tracing::debug;

use crate::db::Datastore;
use crate::error::StoreError;
use crate::guard::ensure_single_select;

/// One result row with fields in SELECT column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub fields: Vec<(String, Value)>,
}

impl Record {
    /// Look up a field value by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Column names in SELECT order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Executes composed queries against the data store.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    store: Datastore,
}

impl QueryExecutor {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    /// Run exactly one read-only statement and collect all rows.
    ///
    /// The structural guard runs before any connection is opened; rejected
    /// text never reaches the database.
    pub fn run(&self, query: &str) -> Result<Vec<Record>, StoreError> {
        ensure_single_select(query)?;

        let conn = self.store.open_scoped()?;
        let mut stmt = conn
            .prepare(query.trim().trim_end_matches(';'))
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let column_names: Vec<String> =
            stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt
            .query([])
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(|e| StoreError::Query(e.to_string()))? {
            let mut fields = Vec::with_capacity(column_names.len());
            for (idx, name) in column_names.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| StoreError::Query(e.to_string()))?;
                fields.push((name.clone(), value_to_json(value)));
            }
            records.push(Record { fields });
        }

        debug!(rows = records.len(), "Query executed");
        Ok(records)
    }
}

/// Map a SQLite value to its JSON representation.
///
/// Binary columns are not rendered; they map to null.
fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn seeded_executor(dir: &tempfile::TempDir) -> QueryExecutor {
        let store = Datastore::new(&dir.path().join("test.db"), Duration::from_millis(500));
        store.initialize().unwrap();

        let conn = store.open_scoped().unwrap();
        conn.execute_batch(
            "INSERT INTO list_requests (id, requester_name, request_purpose)
             VALUES (1, 'Rohan', 'Q3 targeting');
             INSERT INTO list_versions (id, request_id, version_number, created_by)
             VALUES (10, 1, 1, 'Priya');
             INSERT INTO target_list_entries (version_id, hcp_id, hcp_name, specialty, tier)
             VALUES (10, 'H1', 'Dr. Jane Doe', 'Cardiology', 'A'),
                    (10, 'H2', 'Dr. Ravi Shankar', 'Oncology', 'B');",
        )
        .unwrap();

        QueryExecutor::new(store)
    }

    // ---- Happy path ----

    #[test]
    fn test_run_returns_ordered_fields() {
        let dir = tempfile::tempdir().unwrap();
        let executor = seeded_executor(&dir);

        let rows = executor
            .run("SELECT hcp_name, specialty, tier FROM target_list_entries ORDER BY hcp_id")
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field_names(), vec!["hcp_name", "specialty", "tier"]);
        assert_eq!(
            rows[0].get("hcp_name"),
            Some(&Value::String("Dr. Jane Doe".to_string()))
        );
        assert_eq!(
            rows[1].get("hcp_name"),
            Some(&Value::String("Dr. Ravi Shankar".to_string()))
        );
    }

    #[test]
    fn test_run_star_select_preserves_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let executor = seeded_executor(&dir);

        let rows = executor
            .run("SELECT * FROM list_requests")
            .unwrap();
        assert_eq!(rows.len(), 1);
        let names = rows[0].field_names();
        assert_eq!(names[0], "id");
        assert!(names.contains(&"requester_name"));
    }

    #[test]
    fn test_run_view_query() {
        let dir = tempfile::tempdir().unwrap();
        let executor = seeded_executor(&dir);

        let rows = executor
            .run("SELECT hcp_name, version_number FROM view_target_list_full")
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("version_number"), Some(&Value::from(1)));
    }

    #[test]
    fn test_run_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let executor = seeded_executor(&dir);

        let rows = executor
            .run("SELECT * FROM target_list_entries WHERE tier = 'Z'")
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_run_trailing_semicolon() {
        let dir = tempfile::tempdir().unwrap();
        let executor = seeded_executor(&dir);
        let rows = executor.run("SELECT COUNT(*) AS n FROM target_list_entries;").unwrap();
        assert_eq!(rows[0].get("n"), Some(&Value::from(2)));
    }

    // ---- Failures ----

    #[test]
    fn test_run_rejects_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let executor = seeded_executor(&dir);
        let result = executor.run("DELETE FROM target_list_entries");
        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }

    #[test]
    fn test_run_rejects_second_statement() {
        let dir = tempfile::tempdir().unwrap();
        let executor = seeded_executor(&dir);
        let result = executor.run("SELECT 1; SELECT 2");
        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }

    #[test]
    fn test_run_unknown_table_is_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let executor = seeded_executor(&dir);
        let result = executor.run("SELECT * FROM no_such_table");
        assert!(matches!(result, Err(StoreError::Query(_))));
    }

    // ---- Value mapping ----

    #[test]
    fn test_null_and_numeric_values() {
        let dir = tempfile::tempdir().unwrap();
        let executor = seeded_executor(&dir);

        let store = Datastore::new(&dir.path().join("test.db"), Duration::from_millis(500));
        let conn = store.open_scoped().unwrap();
        conn.execute(
            "INSERT INTO high_value_prescriber_entries
             (version_id, hcp_name, total_prescriptions, revenue, value_tier)
             VALUES (10, 'Dr. Numeric', 120, 4500.5, NULL)",
            [],
        )
        .unwrap();

        let rows = executor
            .run("SELECT hcp_name, total_prescriptions, revenue, value_tier \
                  FROM high_value_prescriber_entries")
            .unwrap();
        assert_eq!(rows[0].get("total_prescriptions"), Some(&Value::from(120)));
        assert_eq!(rows[0].get("revenue"), Some(&Value::from(4500.5)));
        assert_eq!(rows[0].get("value_tier"), Some(&Value::Null));
    }

    // ---- Record helpers ----

    #[test]
    fn test_record_get_missing_field() {
        let record = Record {
            fields: vec![("a".to_string(), Value::from(1))],
        };
        assert!(record.get("b").is_none());
    }
}
