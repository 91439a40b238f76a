//! Mappers turning raw page records into persisted entities
//!
//! Mappers are registered explicitly at startup; the registry maps each
//! resource key to exactly one handler.

mod record;

pub use record::{DEFAULT_RESOURCES, RecordMapper};

use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{SyncError, SyncResult};
use crate::models::Page;
use crate::storage::EntityStore;

/// Converts raw records of one resource type into persisted entities
pub trait Mapper: Send + Sync {
    /// Resource key this mapper reads from a page (e.g. `invoices`)
    fn resource_key(&self) -> &str;

    /// Persist every record, in order
    ///
    /// Returns how many records were persisted and how many were skipped
    /// because they could not be identified.
    fn persist_all(&self, records: &[Value]) -> Result<DispatchStats>;
}

/// Which mappers see a fetched page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchScope {
    /// Only the mapper for the resource type just fetched
    #[default]
    Scoped,
    /// Every registered mapper, against every page
    All,
}

/// Counters from dispatching one page
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub persisted: usize,
    pub skipped: usize,
    pub mismatches: usize,
}

impl DispatchStats {
    fn merge(&mut self, other: DispatchStats) {
        self.persisted += other.persisted;
        self.skipped += other.skipped;
        self.mismatches += other.mismatches;
    }

    fn mismatch() -> Self {
        Self {
            mismatches: 1,
            ..Self::default()
        }
    }
}

/// Explicit resource-key to mapper registry
pub struct MapperRegistry {
    mappers: BTreeMap<String, Box<dyn Mapper>>,
    scope: DispatchScope,
}

impl MapperRegistry {
    /// Create an empty registry with scoped dispatch
    pub fn new() -> Self {
        Self {
            mappers: BTreeMap::new(),
            scope: DispatchScope::default(),
        }
    }

    /// Registry with a [`RecordMapper`] for each of [`DEFAULT_RESOURCES`]
    pub fn with_defaults(store: Arc<dyn EntityStore>, actor: &str) -> Self {
        let mut registry = Self::new();
        for resource in DEFAULT_RESOURCES {
            registry.register(RecordMapper::new(*resource, Arc::clone(&store), actor));
        }
        registry
    }

    pub fn with_scope(mut self, scope: DispatchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> DispatchScope {
        self.scope
    }

    /// Register a mapper, replacing any previous one for the same key
    ///
    /// Mappers without a resource key cannot be dispatched to and are
    /// rejected. Returns whether the mapper was registered.
    pub fn register(&mut self, mapper: impl Mapper + 'static) -> bool {
        let key = mapper.resource_key().trim().to_string();
        if key.is_empty() {
            warn!("Ignoring mapper without a resource key");
            return false;
        }
        if self.mappers.insert(key.clone(), Box::new(mapper)).is_some() {
            debug!("Replaced mapper for resource={key}");
        }
        true
    }

    pub fn get(&self, resource: &str) -> Option<&dyn Mapper> {
        self.mappers.get(resource).map(|m| m.as_ref())
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.mappers.contains_key(resource)
    }

    pub fn resource_keys(&self) -> impl Iterator<Item = &str> {
        self.mappers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Hand a fetched page of `resource` to the mapper(s) selected by the scope
    ///
    /// Mapping mismatches are logged and skipped. A failing mapper is fatal.
    pub fn dispatch(&self, resource: &str, page: &Page) -> SyncResult<DispatchStats> {
        match self.scope {
            DispatchScope::Scoped => match self.get(resource) {
                Some(mapper) => Self::dispatch_one(mapper, page),
                None => {
                    let mismatch = SyncError::MappingMismatch {
                        resource: resource.to_string(),
                        reason: "no mapper registered".to_string(),
                    };
                    warn!("{mismatch}, skipping page");
                    Ok(DispatchStats::mismatch())
                }
            },
            DispatchScope::All => {
                let mut stats = DispatchStats::default();
                for mapper in self.mappers.values() {
                    stats.merge(Self::dispatch_one(mapper.as_ref(), page)?);
                }
                Ok(stats)
            }
        }
    }

    fn dispatch_one(mapper: &dyn Mapper, page: &Page) -> SyncResult<DispatchStats> {
        let key = mapper.resource_key();
        let Some(records) = page.records(key) else {
            let mismatch = SyncError::MappingMismatch {
                resource: key.to_string(),
                reason: "page has no such key".to_string(),
            };
            warn!("{mismatch}, skipping");
            return Ok(DispatchStats::mismatch());
        };

        mapper.persist_all(records).map_err(SyncError::StoreUnavailable)
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::new()
    }
}
