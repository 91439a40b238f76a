//! connec-import - fetches all Connec! updates since the last synchronization
//!
//! Meant to be run from a scheduler, one invocation at a time. Exits 0 when
//! the run completes (or the importer is disabled) and 1 when it fails; a
//! failed run leaves the checkpoint where it was.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use connec::{ConnecClient, SqliteStore, SyncConfig};
use log::{error, info};

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Import failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Bootstrap config directory
    let config_dir = config::init()?;

    let sync_config = match SyncConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(
                "To configure the importer, either:\n\
                 1. Place a {} file in: {}\n\
                 2. Point {} at a config file\n\
                 3. Or set CONNEC_GROUP_ID (and optionally CONNEC_API_KEY / CONNEC_API_SECRET, CONNEC_SUBSCRIPTIONS)",
                connec::config::CONFIG_FILE,
                config_dir.display(),
                connec::config::CONFIG_PATH_ENV,
            );
            return Err(e);
        }
    };

    if !sync_config.enabled {
        info!("Connec! import is disabled, nothing to do");
        return Ok(());
    }

    let db_path = sync_config
        .database_path()
        .context("Could not determine database path")?;
    let store = Arc::new(SqliteStore::new(&db_path)?);
    let client = ConnecClient::from_config(&sync_config)?;

    info!(
        "Importing {} resource types into {}",
        sync_config.subscriptions.enabled().count(),
        db_path.display()
    );

    let report = connec::import_updates(&sync_config, &client, store)?;

    info!(
        "Synchronized window {} .. {} in {}ms ({} entities)",
        report.previous_checkpoint,
        report.new_checkpoint,
        report.duration_ms,
        report.total_persisted()
    );
    Ok(())
}
