//! Forward-only schema migration runner
//!
//! An ordered list of independently-idempotent steps. Each step checks its
//! own precondition by introspecting the live schema, then applies only
//! additive changes: new tables, nullable columns with safe defaults, and
//! indexes. Steps tolerate re-application and databases written by
//! concurrently-deployed instances that stopped at an earlier step.
//!
//! "Already applied" failures (duplicate column or index) count as
//! success; any other failure aborts opening the store, so nothing runs
//! against a schema of unknown shape.

use rusqlite::Connection;

use super::schema;
use crate::{Error, Result};

/// One migration step: a precondition check and an additive change.
struct MigrationStep {
    name: &'static str,
    needed: fn(&Connection) -> rusqlite::Result<bool>,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

const MIGRATION_STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: "events-base",
        needed: |conn| Ok(!has_table(conn, "events")?),
        apply: |conn| {
            conn.execute(schema::CREATE_EVENTS_TABLE, [])?;
            execute_all(conn, schema::CREATE_BASE_INDEXES)
        },
    },
    MigrationStep {
        name: "events-extraction",
        // The last column of the batch marks the step as applied; earlier
        // columns are re-checked individually so a partial apply heals
        needed: |conn| Ok(!has_column(conn, "events", "output_size_bytes")?),
        apply: |conn| {
            for (column, decl) in schema::EVENT_EXTRACTION_COLUMNS {
                add_column_if_missing(conn, "events", column, decl)?;
            }
            conn.execute(schema::CREATE_SESSION_CACHE_TABLE, [])?;
            execute_all(conn, schema::CREATE_EXTRACTION_INDEXES)
        },
    },
    MigrationStep {
        name: "session-sequencing",
        needed: |conn| Ok(!has_column(conn, "session_cache", "tool_sequence")?),
        apply: |conn| {
            add_column_if_missing(conn, "session_cache", "tool_sequence", "INTEGER DEFAULT 0")?;
            add_column_if_missing(conn, "events", "sequence_index", "INTEGER DEFAULT 0")?;
            execute_all(conn, schema::CREATE_SEQUENCE_INDEXES)
        },
    },
    MigrationStep {
        name: "events-file-tracking",
        needed: |conn| Ok(!has_column(conn, "events", "glob_match_count")?),
        apply: |conn| {
            for (column, decl) in schema::EVENT_FILE_TRACKING_COLUMNS {
                add_column_if_missing(conn, "events", column, decl)?;
            }
            execute_all(conn, schema::CREATE_FILE_TRACKING_INDEXES)
        },
    },
    MigrationStep {
        name: "file-access-log",
        needed: |conn| Ok(!has_table(conn, "file_access_log")?),
        apply: |conn| {
            conn.execute(schema::CREATE_FILE_ACCESS_LOG_TABLE, [])?;
            execute_all(conn, schema::CREATE_FILE_ACCESS_INDEXES)
        },
    },
];

/// Bring the database up to the current schema shape.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    for step in MIGRATION_STEPS {
        let needed = (step.needed)(conn).map_err(|source| Error::Migration {
            step: step.name,
            source,
        })?;
        if !needed {
            continue;
        }

        tracing::debug!("Applying schema migration step '{}'", step.name);
        match (step.apply)(conn) {
            Ok(()) => {}
            Err(source) if is_already_applied(&source) => {}
            Err(source) => {
                return Err(Error::Migration {
                    step: step.name,
                    source,
                });
            }
        }
    }
    Ok(())
}

/// Check whether a table exists
pub fn has_table(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Check whether a column exists on a table (false for a missing table)
pub fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    decl: &str,
) -> rusqlite::Result<()> {
    if has_column(conn, table, column)? {
        return Ok(());
    }
    match conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"), []) {
        Ok(_) => Ok(()),
        Err(err) if is_already_applied(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

fn execute_all(conn: &Connection, statements: &[&str]) -> rusqlite::Result<()> {
    for statement in statements {
        conn.execute(statement, [])?;
    }
    Ok(())
}

/// A concurrent instance got there first; the step's outcome stands.
fn is_already_applied(err: &rusqlite::Error) -> bool {
    let message = err.to_string();
    message.contains("duplicate column name") || message.contains("already exists")
}
