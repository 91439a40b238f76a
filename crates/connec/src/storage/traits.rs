//! Storage trait definitions

use crate::models::{Checkpoint, EntityRecord};
use anyhow::Result;

/// Persistence for the last-synchronized checkpoint
///
/// A single scalar; writes are assumed atomic.
pub trait CheckpointStore: Send + Sync {
    /// Load the saved checkpoint, `None` if no run has completed yet
    fn load_checkpoint(&self) -> Result<Option<Checkpoint>>;

    /// Replace the saved checkpoint
    fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<()>;
}

/// Persistence for imported entities
pub trait EntityStore: Send + Sync {
    /// Insert or replace an entity, keyed by `(resource, id)`
    fn upsert_entity(&self, entity: EntityRecord) -> Result<()>;

    /// Get an entity by resource type and identifier
    fn get_entity(&self, resource: &str, id: &str) -> Result<Option<EntityRecord>>;

    /// List entities of a resource type, ordered by identifier
    fn list_entities(&self, resource: &str) -> Result<Vec<EntityRecord>>;

    /// Count entities of a resource type
    fn count_entities(&self, resource: &str) -> Result<usize>;
}
