//! Typed errors surfaced by the sync engine

/// Errors produced while synchronizing
///
/// Only [`SyncError::RemoteFetch`] is recovered locally (by the retry
/// policy). Mapping mismatches are logged and skipped where they occur.
/// Everything else ends the run without advancing the checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A single fetch attempt failed (transport error, non-200 status or undecodable body)
    #[error("Cannot fetch connec entities={target}: {message}")]
    RemoteFetch {
        target: String,
        status: Option<u16>,
        message: String,
    },

    /// A fetch kept failing after every retry
    #[error("Cannot fetch data for {target} after {attempts} attempts")]
    RetriesExhausted {
        target: String,
        attempts: u32,
        #[source]
        source: Box<SyncError>,
    },

    /// The checkpoint or entity store could not be read or written
    #[error("Store unavailable: {0:#}")]
    StoreUnavailable(#[source] anyhow::Error),

    /// No mapper for a resource type, or a page without the mapper's key
    #[error("No mapping for resource '{resource}': {reason}")]
    MappingMismatch { resource: String, reason: String },
}

impl SyncError {
    pub fn remote(target: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            target: target.into(),
            status,
            message: message.into(),
        }
    }

    pub fn store(error: impl Into<anyhow::Error>) -> Self {
        Self::StoreUnavailable(error.into())
    }

    /// Whether the retry policy may try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteFetch { .. })
    }

    /// Whether the run must stop without advancing the checkpoint
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. } | Self::StoreUnavailable(_))
    }

    /// HTTP status of the failed fetch, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteFetch { status, .. } => *status,
            Self::RetriesExhausted { source, .. } => source.status(),
            _ => None,
        }
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
