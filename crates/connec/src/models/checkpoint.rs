//! Checkpoint marking the end of the last synchronized window

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp (seconds) at which the last successful run started
///
/// Records updated at or after this instant are fetched by the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint(pub i64);

impl Checkpoint {
    /// The "beginning of time" used when no checkpoint has been saved yet
    pub const EPOCH: Checkpoint = Checkpoint(0);

    pub fn new(timestamp: i64) -> Self {
        Self(timestamp)
    }

    /// Checkpoint for the current wall-clock second
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn timestamp(&self) -> i64 {
        self.0
    }

    /// Convert to a UTC datetime, clamping out-of-range values to the epoch
    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }

    /// ISO-8601 rendering with an explicit offset, e.g. `2024-01-31T08:00:00+00:00`
    pub fn to_iso8601(&self) -> String {
        self.to_datetime().to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// Remote filter selecting records updated at or after this checkpoint
    pub fn updated_since_filter(&self) -> String {
        format!("updated_at gte '{}'", self.to_iso8601())
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl From<DateTime<Utc>> for Checkpoint {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.timestamp())
    }
}
