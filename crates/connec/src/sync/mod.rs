//! Sync engine for importing Connec! updates
//!
//! A run is safe to repeat: entities are upserted by identity and the
//! checkpoint only moves after a complete run.

mod orchestrator;
mod pager;
mod retry;

pub use orchestrator::{
    Clock, FILTER_PARAM, SyncOptions, SyncOrchestrator, SyncPhase, SyncReport, SystemClock,
};
pub use pager::{Pager, ResourceStats};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};

use std::sync::Arc;

use crate::client::RemoteClient;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::mappers::MapperRegistry;
use crate::storage::{CheckpointStore, EntityStore};

/// Import every update since the last checkpoint into `store`
///
/// Wires the default mapper registry, wall clock and blocking sleeper
/// around a [`SyncOrchestrator`].
pub fn import_updates<S>(config: &SyncConfig, client: &dyn RemoteClient, store: Arc<S>) -> SyncResult<SyncReport>
where
    S: CheckpointStore + EntityStore + 'static,
{
    let registry = MapperRegistry::with_defaults(store.clone(), &config.default_user_id)
        .with_scope(config.dispatch_scope);

    let mut orchestrator = SyncOrchestrator::new(
        client,
        &*store,
        &registry,
        &ThreadSleeper,
        &SystemClock,
        SyncOptions::from_config(config),
    );
    orchestrator.run(&config.subscriptions)
}
