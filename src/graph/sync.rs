//! Session synchronizer - folds access rows into the co-access graph
//!
//! Runs once per full session (session end or batch trigger), never
//! incrementally per event, so a file touched by three tool calls in one
//! session still contributes to each pair exactly once.
//!
//! Graph writes are best-effort: on failure the session's rows stay
//! unsynced and a later pass retries them. Only event-store failures
//! propagate.

use std::collections::{BTreeMap, BTreeSet};

use super::GraphStore;
use crate::access::AccessMode;
use crate::storage::EventStore;
use crate::Result;

/// Reads unsynced access rows per session and upserts file nodes and
/// pairwise co-access edges.
pub struct GraphSync<'a> {
    events: &'a EventStore,
    graph: &'a dyn GraphStore,
}

impl<'a> GraphSync<'a> {
    /// Create a synchronizer over an event store and a graph collaborator
    pub fn new(events: &'a EventStore, graph: &'a dyn GraphStore) -> Self {
        Self { events, graph }
    }

    /// Sync one session's unsynced access rows into the graph.
    ///
    /// Returns Ok(true) when the session is fully synced afterwards (also
    /// for the no-op case of zero unsynced rows), Ok(false) when the graph
    /// store failed and the rows remain retriable. Idempotent: repeated
    /// calls and repeated invocations for the same session are safe.
    pub fn sync_session(&self, session_id: &str) -> Result<bool> {
        let rows = self.events.unsynced_accesses(session_id)?;
        if rows.is_empty() {
            return Ok(true);
        }

        // One node upsert per (path, mode) seen this session; one edge
        // upsert per unordered pair of distinct paths
        let mut unique_paths: BTreeSet<&str> = BTreeSet::new();
        let mut mode_pairs: BTreeSet<(&str, AccessMode)> = BTreeSet::new();
        let mut roots: BTreeMap<&str, &str> = BTreeMap::new();

        for row in &rows {
            let path = row.normalized_path.as_str();
            if path.is_empty() {
                continue;
            }
            unique_paths.insert(path);
            mode_pairs.insert((path, row.access_mode));
            if let Some(root) = &row.project_root {
                roots.entry(path).or_insert(root.as_str());
            }
        }

        let write = (|| -> Result<()> {
            for (path, mode) in &mode_pairs {
                self.graph.upsert_file(path, *mode, roots.get(path).copied())?;
            }

            if unique_paths.len() >= 2 {
                let paths: Vec<&str> = unique_paths.iter().copied().collect();
                for i in 0..paths.len() {
                    for j in (i + 1)..paths.len() {
                        self.graph.upsert_co_access(paths[i], paths[j])?;
                    }
                }
            }
            Ok(())
        })();

        if let Err(err) = write {
            tracing::warn!(
                "Graph write failed for session {session_id}: {err}; rows stay unsynced"
            );
            return Ok(false);
        }

        self.events.mark_session_synced(session_id)?;
        tracing::debug!(
            "Synced session {session_id}: {} access rows, {} files",
            rows.len(),
            unique_paths.len()
        );
        Ok(true)
    }

    /// Sync every session that still has unsynced access rows.
    ///
    /// Returns the number of sessions fully synced.
    pub fn sync_all(&self) -> Result<usize> {
        let mut synced = 0;
        for session_id in self.events.unsynced_session_ids()? {
            if self.sync_session(&session_id)? {
                synced += 1;
            }
        }
        Ok(synced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;
    use crate::event::HookEvent;
    use crate::graph::SqliteGraphStore;

    fn record_read(store: &EventStore, session: &str, path: &str) {
        let event = HookEvent::from_json(&format!(
            r#"{{"session_id":"{session}","tool_name":"Read","tool_input":{{"file_path":"{path}"}}}}"#
        ))
        .unwrap();
        let extractor = Extractor::new();
        let access = extractor.extract(&event.tool_name, &event.tool_input, None, None);
        store.record_tool_event(&event, &access).unwrap();
    }

    fn record_edit(store: &EventStore, session: &str, path: &str) {
        let event = HookEvent::from_json(&format!(
            r#"{{"session_id":"{session}","tool_name":"Edit","tool_input":{{"file_path":"{path}"}}}}"#
        ))
        .unwrap();
        let extractor = Extractor::new();
        let access = extractor.extract(&event.tool_name, &event.tool_input, None, None);
        store.record_tool_event(&event, &access).unwrap();
    }

    #[test]
    fn test_two_session_co_access_counts() {
        let events = EventStore::open_in_memory().unwrap();
        let graph = SqliteGraphStore::open_in_memory().unwrap();
        let sync = GraphSync::new(&events, &graph);

        record_read(&events, "s1", "/w/a");
        record_read(&events, "s1", "/w/b");
        assert!(sync.sync_session("s1").unwrap());

        record_read(&events, "s2", "/w/a");
        record_read(&events, "s2", "/w/b");
        record_read(&events, "s2", "/w/c");
        assert!(sync.sync_session("s2").unwrap());

        assert_eq!(graph.get_edge("/w/a", "/w/b").unwrap().unwrap().co_access_count, 2);
        assert_eq!(graph.get_edge("/w/a", "/w/c").unwrap().unwrap().co_access_count, 1);
        assert_eq!(graph.get_edge("/w/b", "/w/c").unwrap().unwrap().co_access_count, 1);
        assert_eq!(graph.count_edges().unwrap(), 3);
    }

    #[test]
    fn test_repeated_touches_count_once_per_session() {
        let events = EventStore::open_in_memory().unwrap();
        let graph = SqliteGraphStore::open_in_memory().unwrap();
        let sync = GraphSync::new(&events, &graph);

        record_read(&events, "s1", "/w/a");
        record_read(&events, "s1", "/w/a");
        record_read(&events, "s1", "/w/a");
        record_read(&events, "s1", "/w/b");
        assert!(sync.sync_session("s1").unwrap());

        // Three reads of the same file in one session: one read increment,
        // one co-access increment
        let node = graph.get_file("/w/a").unwrap().unwrap();
        assert_eq!(node.read_count, 1);
        assert_eq!(graph.get_edge("/w/a", "/w/b").unwrap().unwrap().co_access_count, 1);
    }

    #[test]
    fn test_distinct_modes_count_separately() {
        let events = EventStore::open_in_memory().unwrap();
        let graph = SqliteGraphStore::open_in_memory().unwrap();
        let sync = GraphSync::new(&events, &graph);

        record_read(&events, "s1", "/w/a");
        record_edit(&events, "s1", "/w/a");
        assert!(sync.sync_session("s1").unwrap());

        let node = graph.get_file("/w/a").unwrap().unwrap();
        assert_eq!(node.read_count, 1);
        assert_eq!(node.modify_count, 1);
        // A single file produces no edges
        assert_eq!(graph.count_edges().unwrap(), 0);
    }

    #[test]
    fn test_resync_is_a_noop() {
        let events = EventStore::open_in_memory().unwrap();
        let graph = SqliteGraphStore::open_in_memory().unwrap();
        let sync = GraphSync::new(&events, &graph);

        record_read(&events, "s1", "/w/a");
        record_read(&events, "s1", "/w/b");
        assert!(sync.sync_session("s1").unwrap());
        assert!(sync.sync_session("s1").unwrap());

        assert_eq!(graph.get_file("/w/a").unwrap().unwrap().read_count, 1);
        assert_eq!(graph.get_edge("/w/a", "/w/b").unwrap().unwrap().co_access_count, 1);
    }

    #[test]
    fn test_sync_all_covers_every_pending_session() {
        let events = EventStore::open_in_memory().unwrap();
        let graph = SqliteGraphStore::open_in_memory().unwrap();
        let sync = GraphSync::new(&events, &graph);

        record_read(&events, "s1", "/w/a");
        record_read(&events, "s2", "/w/b");
        record_read(&events, "s3", "/w/c");

        assert_eq!(sync.sync_all().unwrap(), 3);
        assert_eq!(events.unsynced_session_ids().unwrap().len(), 0);
        assert_eq!(graph.count_files().unwrap(), 3);
    }

    /// A graph store that always fails, standing in for an unreachable one
    struct UnreachableGraph;

    impl GraphStore for UnreachableGraph {
        fn upsert_file(
            &self,
            _path: &str,
            _mode: AccessMode,
            _project_root: Option<&str>,
        ) -> Result<()> {
            Err(crate::Error::Graph("connection refused".to_string()))
        }

        fn upsert_co_access(&self, _a: &str, _b: &str) -> Result<()> {
            Err(crate::Error::Graph("connection refused".to_string()))
        }

        fn co_accessed_with(&self, _path: &str) -> Result<Vec<crate::graph::CoAccessPeer>> {
            Err(crate::Error::Graph("connection refused".to_string()))
        }
    }

    #[test]
    fn test_graph_failure_leaves_session_retriable() {
        let events = EventStore::open_in_memory().unwrap();
        record_read(&events, "s1", "/w/a");
        record_read(&events, "s1", "/w/b");

        let broken = GraphSync::new(&events, &UnreachableGraph);
        assert!(!broken.sync_session("s1").unwrap());
        assert_eq!(events.unsynced_accesses("s1").unwrap().len(), 2);

        // A later pass against a healthy store succeeds
        let graph = SqliteGraphStore::open_in_memory().unwrap();
        let retry = GraphSync::new(&events, &graph);
        assert!(retry.sync_session("s1").unwrap());
        assert!(events.unsynced_accesses("s1").unwrap().is_empty());
        assert_eq!(graph.get_edge("/w/a", "/w/b").unwrap().unwrap().co_access_count, 1);
    }
}
