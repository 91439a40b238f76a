//! In-memory storage implementation
//!
//! Used by tests and dry runs; nothing survives the process.

use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{CheckpointStore, EntityStore};
use crate::models::{Checkpoint, EntityRecord};

/// In-memory implementation of [`CheckpointStore`] and [`EntityStore`]
///
/// Entities are kept in a `BTreeMap` keyed by `(resource, id)` so listing
/// comes out ordered by identifier like the SQLite store.
pub struct InMemoryStore {
    checkpoint: RwLock<Option<Checkpoint>>,
    entities: RwLock<BTreeMap<(String, String), EntityRecord>>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            checkpoint: RwLock::new(None),
            entities: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store that already holds a checkpoint
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoint: RwLock::new(Some(checkpoint)),
            entities: RwLock::new(BTreeMap::new()),
        }
    }

    /// Total entities across all resource types
    pub fn total_entities(&self) -> Result<usize> {
        let entities = self.entities.read().map_err(|_| anyhow!("entity lock poisoned"))?;
        Ok(entities.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckpointStore for InMemoryStore {
    fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        let checkpoint = self
            .checkpoint
            .read()
            .map_err(|_| anyhow!("checkpoint lock poisoned"))?;
        Ok(*checkpoint)
    }

    fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut current = self
            .checkpoint
            .write()
            .map_err(|_| anyhow!("checkpoint lock poisoned"))?;
        *current = Some(checkpoint);
        Ok(())
    }
}

impl EntityStore for InMemoryStore {
    fn upsert_entity(&self, entity: EntityRecord) -> Result<()> {
        let mut entities = self.entities.write().map_err(|_| anyhow!("entity lock poisoned"))?;
        entities.insert((entity.resource.clone(), entity.id.clone()), entity);
        Ok(())
    }

    fn get_entity(&self, resource: &str, id: &str) -> Result<Option<EntityRecord>> {
        let entities = self.entities.read().map_err(|_| anyhow!("entity lock poisoned"))?;
        Ok(entities.get(&(resource.to_string(), id.to_string())).cloned())
    }

    fn list_entities(&self, resource: &str) -> Result<Vec<EntityRecord>> {
        let entities = self.entities.read().map_err(|_| anyhow!("entity lock poisoned"))?;
        Ok(entities
            .values()
            .filter(|e| e.resource == resource)
            .cloned()
            .collect())
    }

    fn count_entities(&self, resource: &str) -> Result<usize> {
        let entities = self.entities.read().map_err(|_| anyhow!("entity lock poisoned"))?;
        Ok(entities.keys().filter(|(r, _)| r == resource).count())
    }
}
