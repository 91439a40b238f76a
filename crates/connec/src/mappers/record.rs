//! Generic mapper storing raw records keyed by their remote id

use anyhow::Result;
use log::debug;
use serde_json::Value;
use std::sync::Arc;

use super::{DispatchStats, Mapper};
use crate::models::EntityRecord;
use crate::storage::EntityStore;

/// Connec! collections with a mapper registered by default
pub const DEFAULT_RESOURCES: &[&str] = &[
    "accounts",
    "company",
    "employees",
    "invoices",
    "items",
    "journals",
    "organizations",
    "payments",
    "people",
    "projects",
    "purchase_orders",
    "sales_orders",
    "tax_codes",
    "tax_rates",
    "time_activities",
];

/// Persists each record of one resource type as an [`EntityRecord`]
///
/// Records are upserted by `(resource, id)`, so replaying a page after a
/// failed run does not duplicate anything.
pub struct RecordMapper {
    resource: String,
    store: Arc<dyn EntityStore>,
    actor: String,
}

impl RecordMapper {
    /// `actor` is the identity imported records are attributed to
    pub fn new(resource: impl Into<String>, store: Arc<dyn EntityStore>, actor: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            store,
            actor: actor.into(),
        }
    }
}

impl Mapper for RecordMapper {
    fn resource_key(&self) -> &str {
        &self.resource
    }

    fn persist_all(&self, records: &[Value]) -> Result<DispatchStats> {
        let mut stats = DispatchStats::default();

        for raw in records {
            match EntityRecord::from_raw(&self.resource, raw, &self.actor) {
                Some(entity) => {
                    self.store.upsert_entity(entity)?;
                    stats.persisted += 1;
                }
                None => {
                    debug!("Skipping {} record without id", self.resource);
                    stats.skipped += 1;
                }
            }
        }

        Ok(stats)
    }
}
