//! Remote API access
//!
//! The sync engine only needs `GET(target) -> (status, body)`. The trait
//! keeps the transport swappable; [`ConnecClient`] is the HTTP
//! implementation used by the importer.

mod http;

pub use http::ConnecClient;

use anyhow::Result;

use crate::models::{FetchTarget, RemoteResponse};

/// Opaque remote client
///
/// Implementations return `Ok` for any response that arrived, whatever its
/// status; `Err` is reserved for transport failures. Status interpretation
/// belongs to the caller.
pub trait RemoteClient: Send + Sync {
    fn get(&self, target: &FetchTarget) -> Result<RemoteResponse>;
}

impl<T: RemoteClient + ?Sized> RemoteClient for &T {
    fn get(&self, target: &FetchTarget) -> Result<RemoteResponse> {
        (**self).get(target)
    }
}
