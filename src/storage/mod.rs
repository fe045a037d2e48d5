//! Storage layer - append-only event log and derived access log

pub mod migrate;
pub mod schema;
pub mod sqlite;

pub use sqlite::{AccessRecord, EventStore, RecordedEvent, StoreStats};
