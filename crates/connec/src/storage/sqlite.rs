//! SQLite-based storage for the checkpoint and imported entities

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::{CheckpointStore, EntityStore};
use crate::models::{Checkpoint, EntityRecord};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Single-row checkpoint of the last successful run
            CREATE TABLE sync_checkpoint (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                timestamp INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Imported entities, one row per remote identity
            CREATE TABLE entities (
                resource TEXT NOT NULL,
                id TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_by TEXT NOT NULL,
                synced_at TEXT NOT NULL,
                PRIMARY KEY (resource, id)
            );

            CREATE INDEX idx_entities_synced_at ON entities(synced_at);
            "#,
        ),
    ])
}

/// Raw entity row before payload and timestamp decoding
type EntityRow = (String, String, String, String, String);

/// SQLite-backed [`CheckpointStore`] and [`EntityStore`]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and migrate it
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        // WAL lets readers inspect the store while an import is writing
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| anyhow!("database lock poisoned"))?;
        f(&conn)
    }

    fn decode_row(row: EntityRow) -> Result<EntityRecord> {
        let (resource, id, payload, created_by, synced_at) = row;
        let payload = serde_json::from_str(&payload)
            .with_context(|| format!("Corrupt payload for {resource}/{id}"))?;
        let synced_at = DateTime::parse_from_rfc3339(&synced_at)
            .with_context(|| format!("Corrupt synced_at for {resource}/{id}"))?
            .with_timezone(&Utc);

        Ok(EntityRecord {
            resource,
            id,
            payload,
            created_by,
            synced_at,
        })
    }
}

impl CheckpointStore for SqliteStore {
    fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        self.with_conn(|conn| {
            let timestamp: Option<i64> = conn
                .query_row("SELECT timestamp FROM sync_checkpoint WHERE id = 1", [], |row| {
                    row.get(0)
                })
                .optional()
                .context("Failed to read checkpoint")?;
            Ok(timestamp.map(Checkpoint::new))
        })
    }

    fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sync_checkpoint (id, timestamp, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                    timestamp = excluded.timestamp,
                    updated_at = excluded.updated_at",
                params![checkpoint.timestamp(), Utc::now().to_rfc3339()],
            )
            .context("Failed to save checkpoint")?;
            Ok(())
        })
    }
}

impl EntityStore for SqliteStore {
    fn upsert_entity(&self, entity: EntityRecord) -> Result<()> {
        let payload = serde_json::to_string(&entity.payload)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO entities (resource, id, payload, created_by, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(resource, id) DO UPDATE SET
                    payload = excluded.payload,
                    synced_at = excluded.synced_at",
                params![
                    entity.resource,
                    entity.id,
                    payload,
                    entity.created_by,
                    entity.synced_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("Failed to upsert {}/{}", entity.resource, entity.id))?;
            Ok(())
        })
    }

    fn get_entity(&self, resource: &str, id: &str) -> Result<Option<EntityRecord>> {
        let row: Option<EntityRow> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT resource, id, payload, created_by, synced_at
                     FROM entities WHERE resource = ?1 AND id = ?2",
                    params![resource, id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                )
                .optional()?)
        })?;

        row.map(Self::decode_row).transpose()
    }

    fn list_entities(&self, resource: &str) -> Result<Vec<EntityRecord>> {
        let rows: Vec<EntityRow> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT resource, id, payload, created_by, synced_at
                 FROM entities WHERE resource = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([resource], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(Self::decode_row).collect()
    }

    fn count_entities(&self, resource: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM entities WHERE resource = ?1",
                [resource],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }
}
