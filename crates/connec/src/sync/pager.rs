//! Pagination loop for one resource type

use log::info;

use super::retry::{RetryPolicy, Sleeper};
use crate::client::RemoteClient;
use crate::error::{SyncError, SyncResult};
use crate::mappers::MapperRegistry;
use crate::models::{FetchTarget, Page};

/// Per-resource statistics from a pagination sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceStats {
    pub resource: String,
    /// Pages fetched, first page included
    pub pages: usize,
    pub records_persisted: usize,
    pub records_skipped: usize,
    pub mismatches: usize,
}

/// Follows `pagination.next` links for one resource type
///
/// Each page is dispatched to the mapper registry before the next one is
/// requested. There is no page limit: the sweep ends when the server stops
/// returning a `next` link.
pub struct Pager<'a> {
    client: &'a dyn RemoteClient,
    registry: &'a MapperRegistry,
    policy: RetryPolicy,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Pager<'a> {
    pub fn new(
        client: &'a dyn RemoteClient,
        registry: &'a MapperRegistry,
        policy: RetryPolicy,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            client,
            registry,
            policy,
            sleeper,
        }
    }

    /// Fetch and dispatch every page of `resource`
    pub fn run(&self, resource: &str, initial_params: Vec<(String, String)>) -> SyncResult<ResourceStats> {
        let mut stats = ResourceStats {
            resource: resource.to_string(),
            ..ResourceStats::default()
        };

        let mut target = FetchTarget::resource(resource, initial_params);
        loop {
            let page = self.fetch_page(resource, &target)?;
            stats.pages += 1;

            let dispatched = self.registry.dispatch(resource, &page)?;
            stats.records_persisted += dispatched.persisted;
            stats.records_skipped += dispatched.skipped;
            stats.mismatches += dispatched.mismatches;

            match page.next_url() {
                Some(next) => target = FetchTarget::continuation(next),
                None => break,
            }
        }

        info!(
            "Imported entities={resource}: pages={}, persisted={}, skipped={}",
            stats.pages, stats.records_persisted, stats.records_skipped
        );
        Ok(stats)
    }

    /// One fetch through the retry policy; a non-200 status or an
    /// undecodable body counts as a failed attempt
    fn fetch_page(&self, resource: &str, target: &FetchTarget) -> SyncResult<Page> {
        self.policy.run(resource, self.sleeper, || {
            let response = self
                .client
                .get(target)
                .map_err(|e| SyncError::remote(target.label(), None, format!("{e:#}")))?;

            if !response.is_success() {
                return Err(SyncError::remote(
                    target.label(),
                    Some(response.status),
                    format!("code={}", response.status),
                ));
            }
            info!("Received entities={target}, code={}", response.status);

            Page::from_json(&response.body).map_err(|e| {
                SyncError::remote(
                    target.label(),
                    Some(response.status),
                    format!("code={}, undecodable body: {e:#}", response.status),
                )
            })
        })
    }
}
