//! Run orchestration: checkpoint in, every enabled resource, checkpoint out

use log::{debug, info, warn};
use std::time::Instant;

use super::pager::{Pager, ResourceStats};
use super::retry::{RetryPolicy, Sleeper};
use crate::client::RemoteClient;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::mappers::MapperRegistry;
use crate::models::{Checkpoint, Subscriptions};
use crate::storage::CheckpointStore;

/// Query parameter carrying the updated-since filter
pub const FILTER_PARAM: &str = "$filter";

/// Source of the run start time
pub trait Clock {
    fn now(&self) -> Checkpoint;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Checkpoint {
        Checkpoint::now()
    }
}

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Tunables for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOptions {
    pub retry: RetryPolicy,
    /// Lower bound used when no checkpoint has been saved yet
    pub checkpoint_epoch: Checkpoint,
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            checkpoint_epoch: config.checkpoint_epoch(),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Lower bound of the synchronized window
    pub previous_checkpoint: Checkpoint,
    /// Checkpoint saved at the end of the run
    pub new_checkpoint: Checkpoint,
    pub resources: Vec<ResourceStats>,
    /// Disabled resource types, in subscription order
    pub skipped: Vec<String>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn total_pages(&self) -> usize {
        self.resources.iter().map(|r| r.pages).sum()
    }

    pub fn total_persisted(&self) -> usize {
        self.resources.iter().map(|r| r.records_persisted).sum()
    }
}

/// Drives one import run
///
/// The run start time is read before any fetch and becomes the next
/// checkpoint, so records updated while the run is in flight are fetched
/// again next time rather than missed. The checkpoint is only written once
/// every enabled resource type has been swept.
pub struct SyncOrchestrator<'a> {
    client: &'a dyn RemoteClient,
    checkpoints: &'a dyn CheckpointStore,
    registry: &'a MapperRegistry,
    sleeper: &'a dyn Sleeper,
    clock: &'a dyn Clock,
    options: SyncOptions,
    phase: SyncPhase,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        client: &'a dyn RemoteClient,
        checkpoints: &'a dyn CheckpointStore,
        registry: &'a MapperRegistry,
        sleeper: &'a dyn Sleeper,
        clock: &'a dyn Clock,
        options: SyncOptions,
    ) -> Self {
        Self {
            client,
            checkpoints,
            registry,
            sleeper,
            clock,
            options,
            phase: SyncPhase::Idle,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Synchronize every enabled subscription
    ///
    /// On error the checkpoint is left untouched and the phase is `Failed`.
    pub fn run(&mut self, subscriptions: &Subscriptions) -> SyncResult<SyncReport> {
        let started = Instant::now();
        let run_start = self.clock.now();
        self.phase = SyncPhase::Running;

        match self.sync_window(run_start, subscriptions, started) {
            Ok(report) => {
                self.phase = SyncPhase::Completed;
                Ok(report)
            }
            Err(err) => {
                self.phase = SyncPhase::Failed;
                Err(err)
            }
        }
    }

    fn sync_window(
        &self,
        run_start: Checkpoint,
        subscriptions: &Subscriptions,
        started: Instant,
    ) -> SyncResult<SyncReport> {
        let previous = self
            .checkpoints
            .load_checkpoint()
            .map_err(SyncError::StoreUnavailable)?
            .unwrap_or(self.options.checkpoint_epoch);

        info!("Fetching data updates since {previous}");
        let filter = previous.updated_since_filter();
        let pager = Pager::new(self.client, self.registry, self.options.retry, self.sleeper);

        let mut resources = Vec::new();
        let mut skipped = Vec::new();
        for subscription in subscriptions {
            if !subscription.enabled {
                debug!("Skipping disabled entities={}", subscription.resource);
                skipped.push(subscription.resource.clone());
                continue;
            }

            let params = vec![(FILTER_PARAM.to_string(), filter.clone())];
            resources.push(pager.run(&subscription.resource, params)?);
        }

        // A clock behind the saved checkpoint must not move it backwards
        let new_checkpoint = if run_start < previous {
            warn!("Run started at {run_start}, before checkpoint {previous}; keeping checkpoint");
            previous
        } else {
            run_start
        };
        self.checkpoints
            .save_checkpoint(new_checkpoint)
            .map_err(SyncError::StoreUnavailable)?;

        let report = SyncReport {
            previous_checkpoint: previous,
            new_checkpoint,
            resources,
            skipped,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Import complete: {} resource types, {} pages, {} entities; checkpoint now {new_checkpoint}",
            report.resources.len(),
            report.total_pages(),
            report.total_persisted()
        );
        Ok(report)
    }
}
