//! SQLite event store
//!
//! The append-only event log plus the derived per-path access log. One
//! tool invocation becomes one event row and zero or more access rows,
//! written in a single transaction: losing an event is real data loss, so
//! write failures propagate.

use std::path::Path;

use rusqlite::{params, Connection};

use super::migrate;
use crate::access::{AccessMode, FileAccessResult};
use crate::event::{analyze_output, tool_category, HookEvent};
use crate::{Error, Result};

/// SQLite-backed storage for tool events and file accesses
pub struct EventStore {
    conn: Connection,
}

/// Outcome of recording one tool event
#[derive(Debug, Clone, Copy)]
pub struct RecordedEvent {
    pub event_id: i64,
    pub access_rows: usize,
}

/// One row of the derived access log.
///
/// Immutable once written, except for `synced_to_graph` which flips
/// false→true exactly once, for a whole session at a time.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub id: i64,
    pub event_id: Option<i64>,
    pub session_id: String,
    pub file_path: String,
    pub normalized_path: String,
    pub access_mode: AccessMode,
    pub project_root: Option<String>,
    pub timestamp: String,
    pub tool_name: Option<String>,
    pub line_numbers: Vec<u32>,
    pub is_primary_target: bool,
    pub is_glob_expansion: bool,
    pub synced_to_graph: bool,
}

impl EventStore {
    /// Open a database file (creates if it doesn't exist) and bring its
    /// schema up to date
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        migrate::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Record one tool invocation: the event row with inline extraction
    /// results, plus one access-log row per touched path.
    pub fn record_tool_event(
        &self,
        event: &HookEvent,
        access: &FileAccessResult,
    ) -> Result<RecordedEvent> {
        let timestamp = event.effective_timestamp();
        let raw_json = event.sanitized_json()?;
        let analysis = analyze_output(event.tool_output.as_ref());

        let all_paths = access.all_paths();
        let file_paths_json = if all_paths.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&all_paths)?)
        };

        self.conn.execute("BEGIN IMMEDIATE", [])?;

        let write = (|| -> Result<RecordedEvent> {
            let sequence = self.next_tool_sequence(&event.session_id, &timestamp, event.cwd.as_deref())?;

            self.conn.execute(
                r#"
                INSERT INTO events (
                    session_id, timestamp, raw_json, cwd,
                    tool_name, tool_category, file_path, command, pattern,
                    success, error_message, has_stderr, was_interrupted,
                    output_size_bytes, sequence_index,
                    file_paths_json, access_mode, project_root, glob_match_count
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
                "#,
                params![
                    event.session_id,
                    timestamp,
                    raw_json,
                    event.cwd,
                    event.tool_name,
                    tool_category(&event.tool_name),
                    access.primary_path,
                    event.command_summary(),
                    event.search_pattern(),
                    analysis.success as i64,
                    analysis.error_message,
                    analysis.has_stderr as i64,
                    analysis.was_interrupted as i64,
                    event.tool_output.as_ref().map_or(0, |o| o.size_bytes()) as i64,
                    sequence,
                    file_paths_json,
                    access.access_mode.as_str(),
                    access.project_root,
                    if access.is_glob_expansion {
                        Some(access.related_paths.len() as i64)
                    } else {
                        None
                    },
                ],
            )?;
            let event_id = self.conn.last_insert_rowid();

            let mut access_rows = 0usize;
            if let Some(primary) = &access.primary_path {
                self.insert_access_row(event_id, event, &timestamp, access, primary, true, false)?;
                access_rows += 1;
            }
            for related in &access.related_paths {
                self.insert_access_row(
                    event_id,
                    event,
                    &timestamp,
                    access,
                    related,
                    false,
                    access.is_glob_expansion,
                )?;
                access_rows += 1;
            }

            Ok(RecordedEvent {
                event_id,
                access_rows,
            })
        })();

        match write {
            Ok(recorded) => {
                self.conn.execute("COMMIT", [])?;
                Ok(recorded)
            }
            Err(err) => {
                let _ = self.conn.execute("ROLLBACK", []);
                Err(err)
            }
        }
    }

    fn insert_access_row(
        &self,
        event_id: i64,
        event: &HookEvent,
        timestamp: &str,
        access: &FileAccessResult,
        path: &str,
        is_primary: bool,
        is_glob_expansion: bool,
    ) -> Result<()> {
        let line_numbers_json = match access.line_numbers.get(path) {
            Some(lines) if !lines.is_empty() => Some(serde_json::to_string(lines)?),
            _ => None,
        };

        self.conn.execute(
            r#"
            INSERT INTO file_access_log (
                event_id, session_id, file_path, normalized_path, access_mode,
                project_root, timestamp, tool_name, line_numbers_json,
                is_primary_target, is_glob_expansion
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                event_id,
                event.session_id,
                path,
                path,
                access.access_mode.as_str(),
                access.project_root,
                timestamp,
                event.tool_name,
                line_numbers_json,
                is_primary as i64,
                is_glob_expansion as i64,
            ],
        )?;
        Ok(())
    }

    /// Next per-session sequence number, held in the session cache so that
    /// independently-scheduled invocations stay ordered.
    ///
    /// Returns the current value and increments the stored counter.
    fn next_tool_sequence(
        &self,
        session_id: &str,
        timestamp: &str,
        cwd: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO session_cache (session_id, started_at, cwd) VALUES (?1, ?2, ?3)",
            params![session_id, timestamp, cwd],
        )?;
        let current: i64 = self.conn.query_row(
            "SELECT tool_sequence FROM session_cache WHERE session_id = ?1",
            [session_id],
            |row| row.get::<_, Option<i64>>(0).map(|v| v.unwrap_or(0)),
        )?;
        self.conn.execute(
            "UPDATE session_cache SET tool_sequence = ?1 WHERE session_id = ?2",
            params![current + 1, session_id],
        )?;
        Ok(current)
    }

    // ========== Sync Support ==========

    /// All not-yet-synced access rows for a session, oldest first
    pub fn unsynced_accesses(&self, session_id: &str) -> Result<Vec<AccessRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, event_id, session_id, file_path, normalized_path, access_mode,
                   project_root, timestamp, tool_name, line_numbers_json,
                   is_primary_target, is_glob_expansion, synced_to_graph
            FROM file_access_log
            WHERE session_id = ?1 AND synced_to_graph = 0
            ORDER BY id ASC
            "#,
        )?;

        let records = stmt
            .query_map([session_id], Self::row_to_access)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Sessions that still have unsynced access rows, oldest first
    pub fn unsynced_session_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT session_id FROM file_access_log
            WHERE synced_to_graph = 0
            GROUP BY session_id
            ORDER BY MIN(timestamp) ASC
            "#,
        )?;

        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Mark every access row of a session as synced, in one atomic pass.
    ///
    /// Returns the number of rows flipped.
    pub fn mark_session_synced(&self, session_id: &str) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE file_access_log SET synced_to_graph = 1 WHERE session_id = ?1 AND synced_to_graph = 0",
            [session_id],
        )?;
        Ok(changed)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let events: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        let access_rows: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM file_access_log", [], |row| row.get(0))?;
        let unsynced_rows: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM file_access_log WHERE synced_to_graph = 0",
            [],
            |row| row.get(0),
        )?;
        let sessions: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT session_id) FROM events",
            [],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            events: events as usize,
            access_rows: access_rows as usize,
            unsynced_rows: unsynced_rows as usize,
            sessions: sessions as usize,
        })
    }

    /// Helper to convert a row to an AccessRecord
    fn row_to_access(row: &rusqlite::Row) -> rusqlite::Result<AccessRecord> {
        let mode_str: String = row.get(5)?;
        let access_mode: AccessMode = mode_str.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let line_numbers_json: Option<String> = row.get(9)?;
        let line_numbers = line_numbers_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default();

        Ok(AccessRecord {
            id: row.get(0)?,
            event_id: row.get(1)?,
            session_id: row.get(2)?,
            file_path: row.get(3)?,
            normalized_path: row.get(4)?,
            access_mode,
            project_root: row.get(6)?,
            timestamp: row.get(7)?,
            tool_name: row.get(8)?,
            line_numbers,
            is_primary_target: row.get::<_, i64>(10)? != 0,
            is_glob_expansion: row.get::<_, i64>(11)? != 0,
            synced_to_graph: row.get::<_, i64>(12)? != 0,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub events: usize,
    pub access_rows: usize,
    pub unsynced_rows: usize,
    pub sessions: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Event Store Statistics:")?;
        writeln!(f, "  Events: {}", self.events)?;
        writeln!(f, "  Access rows: {}", self.access_rows)?;
        writeln!(f, "  Unsynced access rows: {}", self.unsynced_rows)?;
        writeln!(f, "  Sessions: {}", self.sessions)
    }
}
