//! Connec! crate - incremental import of remote collections
//!
//! This crate provides the synchronization engine behind `connec-import`:
//! - Domain models (Checkpoint, Subscriptions, Page, EntityRecord)
//! - A blocking HTTP client for the Connec! API
//! - Explicit mapper registry dispatching payloads to persistence
//! - Checkpoint and entity storage (in-memory and SQLite)
//! - Retry policy, pager and run orchestrator
//!
//! A run reads the last checkpoint, fetches every enabled resource type
//! updated since then, and only advances the checkpoint when all of them
//! complete.

pub mod client;
pub mod config;
pub mod error;
pub mod mappers;
pub mod models;
pub mod storage;
pub mod sync;

pub use client::{ConnecClient, RemoteClient};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use mappers::{DEFAULT_RESOURCES, DispatchScope, DispatchStats, Mapper, MapperRegistry, RecordMapper};
pub use models::{Checkpoint, EntityRecord, FetchTarget, Page, Pagination, RemoteResponse, Subscription, Subscriptions};
pub use storage::{CheckpointStore, EntityStore, InMemoryStore, SqliteStore};
pub use sync::{
    Clock, FILTER_PARAM, Pager, ResourceStats, RetryPolicy, Sleeper, SyncOptions, SyncOrchestrator,
    SyncPhase, SyncReport, SystemClock, ThreadSleeper, import_updates,
};
