//! Database schema definitions
//!
//! The schema has no single version counter: each migration step in
//! `migrate` checks the actual shape of the database (table and column
//! presence) and applies only what is missing.

/// SQL to create the base events table (the append-only log)
pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    raw_json TEXT NOT NULL
)
"#;

/// SQL to create the session cache (per-session sequence state)
pub const CREATE_SESSION_CACHE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS session_cache (
    session_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    cwd TEXT
)
"#;

/// SQL to create the derived per-path access log
pub const CREATE_FILE_ACCESS_LOG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS file_access_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id INTEGER REFERENCES events(id),
    session_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    normalized_path TEXT NOT NULL,
    access_mode TEXT NOT NULL,
    project_root TEXT,
    timestamp TEXT NOT NULL,
    tool_name TEXT,
    line_numbers_json TEXT,
    is_primary_target INTEGER NOT NULL DEFAULT 1,
    is_glob_expansion INTEGER NOT NULL DEFAULT 0,
    synced_to_graph INTEGER NOT NULL DEFAULT 0
)
"#;

/// Extraction and outcome columns added to events after the base table
pub const EVENT_EXTRACTION_COLUMNS: &[(&str, &str)] = &[
    ("cwd", "TEXT"),
    ("tool_name", "TEXT"),
    ("tool_category", "TEXT"),
    ("file_path", "TEXT"),
    ("command", "TEXT"),
    ("pattern", "TEXT"),
    ("success", "INTEGER"),
    ("error_message", "TEXT"),
    ("has_stderr", "INTEGER"),
    ("was_interrupted", "INTEGER"),
    ("output_size_bytes", "INTEGER"),
];

/// Enhanced file-tracking columns added to events
pub const EVENT_FILE_TRACKING_COLUMNS: &[(&str, &str)] = &[
    ("file_paths_json", "TEXT"),
    ("access_mode", "TEXT"),
    ("project_root", "TEXT"),
    ("glob_match_count", "INTEGER"),
];

/// Indexes on the base events table
pub const CREATE_BASE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_events_session ON events(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
];

/// Indexes on the extraction columns
pub const CREATE_EXTRACTION_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_events_tool_name ON events(tool_name)",
    "CREATE INDEX IF NOT EXISTS idx_events_file_path ON events(file_path)",
];

/// Index on the per-session sequence
pub const CREATE_SEQUENCE_INDEXES: &[&str] =
    &["CREATE INDEX IF NOT EXISTS idx_events_sequence ON events(session_id, sequence_index)"];

/// Indexes on the file-tracking columns
pub const CREATE_FILE_TRACKING_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_events_access_mode ON events(access_mode)",
    "CREATE INDEX IF NOT EXISTS idx_events_project_root ON events(project_root)",
];

/// Indexes on the access log
pub const CREATE_FILE_ACCESS_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_file_access_session ON file_access_log(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_file_access_path ON file_access_log(normalized_path)",
    "CREATE INDEX IF NOT EXISTS idx_file_access_synced ON file_access_log(synced_to_graph)",
    "CREATE INDEX IF NOT EXISTS idx_file_access_event ON file_access_log(event_id)",
];
