//! SQLite co-access graph store
//!
//! Upsert-only: file nodes and co-access edges are created on first sight
//! and incremented afterwards, never deleted here.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{canonical_pair, CoAccessEdge, CoAccessPeer, FileNode, GraphStore};
use crate::access::AccessMode;
use crate::Result;

/// SQL to create the file nodes table
const CREATE_FILE_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS file_nodes (
    path TEXT PRIMARY KEY,
    read_count INTEGER NOT NULL DEFAULT 0,
    write_count INTEGER NOT NULL DEFAULT 0,
    modify_count INTEGER NOT NULL DEFAULT 0,
    search_count INTEGER NOT NULL DEFAULT 0,
    execute_count INTEGER NOT NULL DEFAULT 0,
    project_root TEXT,
    first_accessed TEXT NOT NULL,
    last_accessed TEXT NOT NULL
)
"#;

/// SQL to create the co-access edges table (smaller path always first)
const CREATE_CO_ACCESS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS co_access_edges (
    path_a TEXT NOT NULL,
    path_b TEXT NOT NULL,
    co_access_count INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (path_a, path_b)
)
"#;

const CREATE_GRAPH_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_co_access_b ON co_access_edges(path_b)",
    "CREATE INDEX IF NOT EXISTS idx_file_nodes_project ON file_nodes(project_root)",
];

/// SQLite-backed co-access graph
pub struct SqliteGraphStore {
    conn: Connection,
}

impl SqliteGraphStore {
    /// Open a database file (creates if it doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(CREATE_FILE_NODES_TABLE, [])?;
        self.conn.execute(CREATE_CO_ACCESS_TABLE, [])?;
        for statement in CREATE_GRAPH_INDEXES {
            self.conn.execute(statement, [])?;
        }
        Ok(())
    }

    /// Get a file node by path
    pub fn get_file(&self, path: &str) -> Result<Option<FileNode>> {
        self.conn
            .query_row(
                r#"
                SELECT path, read_count, write_count, modify_count, search_count,
                       execute_count, project_root, first_accessed, last_accessed
                FROM file_nodes WHERE path = ?1
                "#,
                [path],
                Self::row_to_file,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a co-access edge for an unordered pair
    pub fn get_edge(&self, a: &str, b: &str) -> Result<Option<CoAccessEdge>> {
        let (first, second) = canonical_pair(a, b);
        self.conn
            .query_row(
                r#"
                SELECT path_a, path_b, co_access_count, created_at, updated_at
                FROM co_access_edges WHERE path_a = ?1 AND path_b = ?2
                "#,
                [first, second],
                Self::row_to_edge,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Count all file nodes
    pub fn count_files(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Count all co-access edges
    pub fn count_edges(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM co_access_edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileNode> {
        Ok(FileNode {
            path: row.get(0)?,
            read_count: row.get(1)?,
            write_count: row.get(2)?,
            modify_count: row.get(3)?,
            search_count: row.get(4)?,
            execute_count: row.get(5)?,
            project_root: row.get(6)?,
            first_accessed: row.get(7)?,
            last_accessed: row.get(8)?,
        })
    }

    fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<CoAccessEdge> {
        Ok(CoAccessEdge {
            path_a: row.get(0)?,
            path_b: row.get(1)?,
            co_access_count: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl GraphStore for SqliteGraphStore {
    fn upsert_file(
        &self,
        path: &str,
        mode: AccessMode,
        project_root: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        // The counter column is picked from a fixed set, never from input
        let column = mode.counter_column();
        let sql = format!(
            r#"
            INSERT INTO file_nodes (path, project_root, {column}, first_accessed, last_accessed)
            VALUES (?1, ?2, 1, ?3, ?3)
            ON CONFLICT(path) DO UPDATE SET
                {column} = {column} + 1,
                last_accessed = excluded.last_accessed,
                project_root = COALESCE(excluded.project_root, file_nodes.project_root)
            "#
        );
        self.conn.execute(&sql, params![path, project_root, now])?;
        Ok(())
    }

    fn upsert_co_access(&self, path_a: &str, path_b: &str) -> Result<()> {
        let (first, second) = canonical_pair(path_a, path_b);
        if first == second {
            return Ok(());
        }
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO co_access_edges (path_a, path_b, co_access_count, created_at, updated_at)
            VALUES (?1, ?2, 1, ?3, ?3)
            ON CONFLICT(path_a, path_b) DO UPDATE SET
                co_access_count = co_access_count + 1,
                updated_at = excluded.updated_at
            "#,
            params![first, second, now],
        )?;
        Ok(())
    }

    fn co_accessed_with(&self, path: &str) -> Result<Vec<CoAccessPeer>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT CASE WHEN path_a = ?1 THEN path_b ELSE path_a END AS peer,
                   co_access_count
            FROM co_access_edges
            WHERE path_a = ?1 OR path_b = ?1
            ORDER BY co_access_count DESC, peer ASC
            "#,
        )?;

        let peers = stmt
            .query_map([path], |row| {
                Ok(CoAccessPeer {
                    path: row.get(0)?,
                    co_access_count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(peers)
    }
}
