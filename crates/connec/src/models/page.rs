//! Fetch requests and decoded result pages

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// What a single remote fetch asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    /// First page of a resource collection, with query parameters
    Resource {
        name: String,
        params: Vec<(String, String)>,
    },
    /// Continuation page, reusing the server-provided `next` link verbatim
    Continuation { url: String },
}

impl FetchTarget {
    pub fn resource(name: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self::Resource {
            name: name.into(),
            params,
        }
    }

    pub fn continuation(url: impl Into<String>) -> Self {
        Self::Continuation { url: url.into() }
    }

    /// Resource name or continuation URL, for log lines
    pub fn label(&self) -> &str {
        match self {
            Self::Resource { name, .. } => name,
            Self::Continuation { url } => url,
        }
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw response from the remote client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Only 200 counts as success
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Pagination descriptor attached to a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
}

/// A decoded result page
///
/// Every top-level key other than `pagination` is a resource collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub resources: Map<String, Value>,
    pub pagination: Option<Pagination>,
}

impl Page {
    /// Decode a response body
    pub fn from_json(body: &str) -> Result<Self> {
        let mut resources: Map<String, Value> =
            serde_json::from_str(body).context("Failed to parse page body")?;

        let pagination = match resources.remove("pagination") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<Pagination>(value)
                    .context("Failed to parse pagination descriptor")?,
            ),
        };

        Ok(Self {
            resources,
            pagination,
        })
    }

    /// Continuation link, if the server indicated another page
    pub fn next_url(&self) -> Option<&str> {
        self.pagination
            .as_ref()?
            .next
            .as_deref()
            .filter(|next| !next.is_empty())
    }

    /// Raw records for a resource key
    ///
    /// Singleton resources (e.g. `company`) come back as a bare object and are
    /// exposed as a one-element slice. `None` means the key is absent.
    pub fn records(&self, resource: &str) -> Option<&[Value]> {
        match self.resources.get(resource)? {
            Value::Array(items) => Some(items),
            Value::Null => None,
            other => Some(std::slice::from_ref(other)),
        }
    }

    pub fn resource_keys(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }
}
