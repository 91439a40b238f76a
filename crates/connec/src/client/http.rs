//! Connec! API HTTP client
//!
//! Uses synchronous HTTP (ureq); the importer is a single blocking flow.

use anyhow::{Context, Result};
use base64::prelude::*;
use std::time::Duration;
use url::Url;

use super::RemoteClient;
use crate::config::SyncConfig;
use crate::models::{FetchTarget, RemoteResponse};

/// HTTP client for one Connec! group
pub struct ConnecClient {
    agent: ureq::Agent,
    base: Url,
    api_path: String,
    group_id: String,
    authorization: Option<String>,
}

impl ConnecClient {
    /// Per-request timeout unless overridden
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a client for `{api_host}/{api_path}/{group_id}/...`
    pub fn new(api_host: &str, api_path: &str, group_id: &str) -> Result<Self> {
        let mut base = Url::parse(api_host).with_context(|| format!("Invalid API host: {api_host}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            agent: Self::build_agent(Self::DEFAULT_TIMEOUT),
            base,
            api_path: api_path.trim_matches('/').to_string(),
            group_id: group_id.to_string(),
            authorization: None,
        })
    }

    /// Create a client from the import configuration
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let client = Self::new(&config.api_host, &config.api_path, &config.group_id)?
            .with_timeout(Duration::from_secs(config.request_timeout_secs));

        Ok(match (&config.api_key, &config.api_secret) {
            (Some(key), Some(secret)) => client.with_credentials(key, secret),
            _ => client,
        })
    }

    /// Forward API credentials as a Basic authorization header
    pub fn with_credentials(mut self, key: &str, secret: &str) -> Self {
        let token = BASE64_STANDARD.encode(format!("{key}:{secret}"));
        self.authorization = Some(format!("Basic {token}"));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = Self::build_agent(timeout);
        self
    }

    /// Non-2xx responses are returned as responses, not errors, so the
    /// caller can log and retry on the status code.
    fn build_agent(timeout: Duration) -> ureq::Agent {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        ureq::Agent::new_with_config(config)
    }

    /// URL of the first page of a resource collection
    pub fn resource_url(&self, resource: &str, params: &[(String, String)]) -> Result<Url> {
        let path = if self.api_path.is_empty() {
            format!("{}/{}", self.group_id, resource)
        } else {
            format!("{}/{}/{}", self.api_path, self.group_id, resource)
        };
        let mut url = self
            .base
            .join(&path)
            .with_context(|| format!("Invalid resource path: {path}"))?;

        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Resolve a `pagination.next` link, absolute or host-relative
    pub fn continuation_url(&self, next: &str) -> Result<Url> {
        self.base
            .join(next)
            .with_context(|| format!("Invalid continuation link: {next}"))
    }

    fn target_url(&self, target: &FetchTarget) -> Result<Url> {
        match target {
            FetchTarget::Resource { name, params } => self.resource_url(name, params),
            FetchTarget::Continuation { url } => self.continuation_url(url),
        }
    }
}

impl RemoteClient for ConnecClient {
    fn get(&self, target: &FetchTarget) -> Result<RemoteResponse> {
        let url = self.target_url(target)?;

        let mut request = self.agent.get(url.as_str()).header("Accept", "application/json");
        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization);
        }

        let mut response = request
            .call()
            .with_context(|| format!("Failed to send request for {target}"))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .with_context(|| format!("Failed to read response body for {target}"))?;

        Ok(RemoteResponse::new(status, body))
    }
}
