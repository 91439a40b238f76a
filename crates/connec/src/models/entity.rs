//! Local entity persisted from a raw remote record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw record as stored locally
///
/// Identity is `(resource, id)`; storing the same identity twice replaces
/// the earlier version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Resource type the record belongs to (e.g. `invoices`)
    pub resource: String,
    /// Remote identifier, passed through unchanged
    pub id: String,
    /// The raw record
    pub payload: Value,
    /// Actor the import is attributed to
    pub created_by: String,
    /// When the record was last written locally
    pub synced_at: DateTime<Utc>,
}

impl EntityRecord {
    /// Build a record from a raw payload, or `None` if it has no identifier
    pub fn from_raw(resource: impl Into<String>, raw: &Value, created_by: impl Into<String>) -> Option<Self> {
        let id = record_identifier(raw)?;
        Some(Self {
            resource: resource.into(),
            id,
            payload: raw.clone(),
            created_by: created_by.into(),
            synced_at: Utc::now(),
        })
    }
}

/// Extract the identifier of a raw record
///
/// String ids are used as-is and numbers keep their decimal form. Structured
/// ids (arrays of provider ids) are kept as their compact JSON text so the
/// identity stays stable across runs.
pub fn record_identifier(raw: &Value) -> Option<String> {
    match raw.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::String(_) | Value::Null | Value::Bool(_) => None,
        Value::Number(n) => Some(n.to_string()),
        structured => Some(structured.to_string()),
    }
}
