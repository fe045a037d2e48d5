//! # Toolscope - File-Access Tracking for Assistant Tool Events
//!
//! Toolscope observes tool-use events emitted by an AI coding assistant's
//! CLI and turns heterogeneous tool invocations (shell commands,
//! pattern-matching tool calls, direct file operations) into canonical
//! records of which files were touched, how, and by what.
//!
//! Toolscope provides:
//! - Path resolution and normalization with project-root detection
//! - File-path extraction from shell command text and search-tool output
//! - SQLite-backed append-only event log with a derived per-path access log
//! - A cross-session co-access graph tracking per-file access counters and
//!   which files tend to be touched together

pub mod access;
pub mod command;
pub mod config;
pub mod event;
pub mod extract;
pub mod graph;
pub mod output;
pub mod resolve;
pub mod storage;

// Re-exports for convenient access
pub use access::{AccessMode, FileAccessResult, ToolKind};
pub use event::{HookEvent, ToolOutput};
pub use extract::Extractor;
pub use graph::{GraphStore, GraphSync, SqliteGraphStore};
pub use resolve::{normalize_path, resolve_path, ResolvedPath};
pub use storage::EventStore;

/// Result type alias for Toolscope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Toolscope operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Migration step '{step}' failed: {source}")]
    Migration {
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Graph store error: {0}")]
    Graph(String),

    #[error("Invalid access mode: {0}")]
    InvalidAccessMode(String),
}
