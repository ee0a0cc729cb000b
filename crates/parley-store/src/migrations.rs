//! Database schema migrations for the list-management dataset.
//!
//! Applies the request/version/entry tables plus the reporting views the
//! query composer is taught about in its schema description.

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental
/// changes.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| StoreError::Schema(format!("failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Schema(format!("failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        -- Business domains and their subdivisions.
        CREATE TABLE IF NOT EXISTS domains (
            id           INTEGER PRIMARY KEY,
            domain_name  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS subdomains (
            id              INTEGER PRIMARY KEY,
            domain_id       INTEGER NOT NULL REFERENCES domains (id),
            subdomain_name  TEXT NOT NULL
        );

        -- A business request for creating or updating a list of HCPs.
        CREATE TABLE IF NOT EXISTS list_requests (
            id               INTEGER PRIMARY KEY,
            subdomain_id     INTEGER REFERENCES subdomains (id),
            requester_name   TEXT NOT NULL,
            request_purpose  TEXT NOT NULL DEFAULT '',
            status           TEXT NOT NULL DEFAULT 'Requested',
            assigned_to      TEXT,
            created_at       INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        -- Numbered versions tracking each request's evolution.
        CREATE TABLE IF NOT EXISTS list_versions (
            id                INTEGER PRIMARY KEY,
            request_id        INTEGER NOT NULL REFERENCES list_requests (id),
            version_number    INTEGER NOT NULL,
            change_type       TEXT,
            change_rationale  TEXT,
            created_by        TEXT,
            is_current        INTEGER NOT NULL DEFAULT 0,
            created_at        INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_list_versions_request
            ON list_versions (request_id, version_number);

        -- HCPs in each list version; the core data of a target list.
        CREATE TABLE IF NOT EXISTS target_list_entries (
            id          INTEGER PRIMARY KEY,
            version_id  INTEGER NOT NULL REFERENCES list_versions (id),
            hcp_id      TEXT NOT NULL,
            hcp_name    TEXT NOT NULL,
            specialty   TEXT,
            territory   TEXT,
            tier        TEXT,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            updated_at  INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_target_entries_version
            ON target_list_entries (version_id);

        -- Planned or completed sales calls to HCPs.
        CREATE TABLE IF NOT EXISTS call_list_entries (
            id          INTEGER PRIMARY KEY,
            version_id  INTEGER REFERENCES list_versions (id),
            hcp_id      TEXT NOT NULL,
            hcp_name    TEXT NOT NULL,
            call_date   TEXT,
            sales_rep   TEXT,
            status      TEXT NOT NULL DEFAULT 'Planned'
        );

        -- Competitor engagements with HCPs.
        CREATE TABLE IF NOT EXISTS competitor_target_entries (
            id                    INTEGER PRIMARY KEY,
            version_id            INTEGER REFERENCES list_versions (id),
            hcp_name              TEXT NOT NULL,
            competitor_product    TEXT,
            conversion_potential  TEXT,
            assigned_rep          TEXT
        );

        -- Digital outreach contacts.
        CREATE TABLE IF NOT EXISTS digital_engagement_entries (
            id            INTEGER PRIMARY KEY,
            version_id    INTEGER REFERENCES list_versions (id),
            contact_name  TEXT NOT NULL,
            email         TEXT,
            specialty     TEXT,
            opt_in        INTEGER NOT NULL DEFAULT 0
        );

        -- Formulary and approval decision makers.
        CREATE TABLE IF NOT EXISTS formulary_decision_maker_entries (
            id               INTEGER PRIMARY KEY,
            version_id       INTEGER REFERENCES list_versions (id),
            contact_name     TEXT NOT NULL,
            organization     TEXT,
            influence_level  TEXT
        );

        -- HCPs generating high prescription or revenue volume.
        CREATE TABLE IF NOT EXISTS high_value_prescriber_entries (
            id                   INTEGER PRIMARY KEY,
            version_id           INTEGER REFERENCES list_versions (id),
            hcp_name             TEXT NOT NULL,
            total_prescriptions  INTEGER,
            revenue              REAL,
            value_tier           TEXT
        );

        -- Health systems / hospital networks and their contacts.
        CREATE TABLE IF NOT EXISTS idn_health_system_entries (
            id            INTEGER PRIMARY KEY,
            version_id    INTEGER REFERENCES list_versions (id),
            system_name   TEXT NOT NULL,
            contact_name  TEXT,
            importance    TEXT
        );

        -- Audit trail for requests, versions, and activities.
        CREATE TABLE IF NOT EXISTS work_logs (
            id                    INTEGER PRIMARY KEY,
            request_id            INTEGER REFERENCES list_requests (id),
            worker_name           TEXT NOT NULL,
            activity_description  TEXT,
            decisions_made        TEXT,
            activity_date         INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        -- HCP details joined with the version that contains them.
        CREATE VIEW IF NOT EXISTS view_target_list_full AS
            SELECT e.hcp_id, e.hcp_name, e.specialty, e.territory, e.tier,
                   v.request_id, v.version_number, v.change_type,
                   v.created_by, v.is_current
            FROM target_list_entries e
            JOIN list_versions v ON v.id = e.version_id;

        -- How each list changed over time, with rationale and author.
        CREATE VIEW IF NOT EXISTS view_list_evolution AS
            SELECT v.request_id, v.version_number, v.change_type,
                   v.change_rationale, v.created_by, v.created_at,
                   r.requester_name, r.request_purpose
            FROM list_versions v
            JOIN list_requests r ON r.id = v.request_id;

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| StoreError::Schema(format!("migration v1 failed: {}", e)))?;

    Ok(())
}
