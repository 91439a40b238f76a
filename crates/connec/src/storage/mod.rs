//! Storage traits and implementations
//!
//! The checkpoint and the imported entities sit behind traits so the sync
//! engine can run against an in-memory store in tests and SQLite in
//! production.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CheckpointStore, EntityStore};
