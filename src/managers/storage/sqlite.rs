use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::{LifecycleUnit, UnitContext};
use crate::error::UnitError;
use crate::managers::ConfigManager;

const SCHEMA_VERSION: u32 = 1;

/// SQLite storage backend.
///
/// The database file location comes from the [`ConfigManager`]. The
/// connection is opened in `setup` and closed in `stop`.
pub struct SqliteStore {
    config: Arc<ConfigManager>,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    pub fn new(config: Arc<ConfigManager>) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    /// Reads a value from the metadata table.
    pub async fn meta(&self, key: &str) -> Result<Option<String>, UnitError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(UnitError::NotReady {
            what: "sqlite connection",
        })?;
        let value = conn
            .query_row(
                "SELECT value FROM caboose_meta WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

fn open(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    debug!(journal_mode = %mode, "sqlite journal mode");
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS caboose_meta (
             key   TEXT PRIMARY KEY NOT NULL,
             value TEXT NOT NULL
         );",
    )?;
    conn.execute(
        "INSERT INTO caboose_meta (key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(conn)
}

#[async_trait]
impl LifecycleUnit for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn setup(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        let mut guard = self.conn.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let path = self.config.database_path()?.to_path_buf();
        let shown = path.display().to_string();
        let conn = tokio::task::spawn_blocking(move || open(&path))
            .await
            .map_err(|e| UnitError::Fatal {
                reason: format!("opening sqlite database: {e}"),
            })??;
        *guard = Some(conn);
        info!(path = %shown, schema_version = SCHEMA_VERSION, "sqlite database ready");
        Ok(())
    }

    async fn start(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(UnitError::NotReady {
            what: "sqlite connection",
        })?;
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        debug!(probe = one, "sqlite connection answering");
        Ok(())
    }

    async fn stop(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        let Some(conn) = self.conn.lock().await.take() else {
            return Ok(());
        };
        conn.close().map_err(|(_conn, e)| UnitError::Database(e))?;
        info!("sqlite database closed");
        Ok(())
    }
}
