//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Licitace-Watch database.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Snapshots of extracted records, newest has the highest id
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    taken_at TEXT NOT NULL,
    record_count INTEGER NOT NULL,
    document TEXT NOT NULL
);

-- One row per finished run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT,
    status TEXT NOT NULL,
    current_count INTEGER NOT NULL,
    new_count INTEGER NOT NULL,
    email_sent INTEGER NOT NULL,
    message TEXT NOT NULL
);

-- Single-run lease, expires_at is a unix timestamp in seconds
CREATE TABLE IF NOT EXISTS leases (
    name TEXT PRIMARY KEY,
    holder TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);
"#;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initializes the database schema
///
/// Safe to call on an existing database: every statement is idempotent.
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}
