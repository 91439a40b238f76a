//! Import configuration
//!
//! Loaded from (in order of priority):
//! 1. The JSON file named by `CONNEC_SYNC_CONFIG`
//! 2. `connec-sync.json` in the config directory
//! 3. Environment variables (fallback)

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mappers::DispatchScope;
use crate::models::{Checkpoint, Subscriptions};
use crate::sync::RetryPolicy;

/// Config filename in the config directory
pub const CONFIG_FILE: &str = "connec-sync.json";

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "CONNEC_SYNC_CONFIG";

/// Default SQLite database filename in the config directory
pub const DATABASE_FILE: &str = "connec-sync.db";

pub const DEFAULT_API_HOST: &str = "https://api-connec.maestrano.com";
pub const DEFAULT_API_PATH: &str = "/api/v2";

/// Settings for one import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Master switch; a disabled importer exits successfully without fetching
    pub enabled: bool,
    pub api_host: String,
    pub api_path: String,
    /// Connec! group (organization) whose data is imported
    pub group_id: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Resource types to import, in order
    pub subscriptions: Subscriptions,
    /// Identity imported records are attributed to
    pub default_user_id: String,
    /// Lower bound used when no checkpoint has been saved yet
    pub checkpoint_epoch: i64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub dispatch_scope: DispatchScope,
    /// SQLite database; defaults to `connec-sync.db` in the config directory
    pub database_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_host: DEFAULT_API_HOST.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            group_id: String::new(),
            api_key: None,
            api_secret: None,
            subscriptions: Subscriptions::new(),
            default_user_id: "1".to_string(),
            checkpoint_epoch: Checkpoint::EPOCH.timestamp(),
            max_retries: RetryPolicy::DEFAULT_MAX_RETRIES,
            retry_delay_secs: RetryPolicy::DEFAULT_DELAY_STEP.as_secs(),
            request_timeout_secs: 60,
            dispatch_scope: DispatchScope::default(),
            database_path: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration using the documented priority
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Self::from_file(Path::new(&path));
        }

        if config::config_exists(CONFIG_FILE) {
            let cfg: Self = config::load_json(CONFIG_FILE)?;
            cfg.validate()?;
            return Ok(cfg);
        }

        Self::from_env()
    }

    /// Load configuration from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let cfg: Self = config::load_json_file(path)?;
        cfg.validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(cfg)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json).context("Failed to parse configuration JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a key lookup, using `CONNEC_*` variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = match lookup("CONNEC_ENABLED") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("Invalid CONNEC_ENABLED value: {value}"))?,
            None => true,
        };
        let group_id = match lookup("CONNEC_GROUP_ID") {
            Some(group) => group,
            None if enabled => bail!("CONNEC_GROUP_ID environment variable not set"),
            None => String::new(),
        };
        let mut cfg = Self {
            enabled,
            group_id,
            ..Self::default()
        };

        if let Some(host) = lookup("CONNEC_API_HOST") {
            cfg.api_host = host;
        }
        if let Some(path) = lookup("CONNEC_API_PATH") {
            cfg.api_path = path;
        }
        cfg.api_key = lookup("CONNEC_API_KEY");
        cfg.api_secret = lookup("CONNEC_API_SECRET");

        if let Some(list) = lookup("CONNEC_SUBSCRIPTIONS") {
            cfg.subscriptions =
                Subscriptions::parse_list(&list).context("Invalid CONNEC_SUBSCRIPTIONS")?;
        }
        if let Some(user) = lookup("CONNEC_DEFAULT_USER_ID") {
            cfg.default_user_id = user;
        }
        if let Some(path) = lookup("CONNEC_DATABASE_PATH") {
            cfg.database_path = Some(PathBuf::from(path));
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the importer cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.group_id.trim().is_empty() {
            bail!("group_id must be set");
        }
        url::Url::parse(&self.api_host).with_context(|| format!("Invalid api_host: {}", self.api_host))?;
        if self.api_key.is_some() != self.api_secret.is_some() {
            bail!("api_key and api_secret must be set together");
        }
        if self.default_user_id.trim().is_empty() {
            bail!("default_user_id must not be empty");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_secs(self.retry_delay_secs))
    }

    pub fn checkpoint_epoch(&self) -> Checkpoint {
        Checkpoint::new(self.checkpoint_epoch)
    }

    /// Configured database path, or the default inside the config directory
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| config::config_path(DATABASE_FILE))
    }
}
