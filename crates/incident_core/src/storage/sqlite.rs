use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::AppError;
use crate::storage::KeyValueStorage;

/// Schema steps in order. `PRAGMA user_version` holds how many of them have run.
const SCHEMA_STEPS: &[&str] = &[include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../migrations/0001_kv_store.sql"
))];

fn schema_err(message: &str, e: rusqlite::Error) -> AppError {
    AppError::new("STORAGE_SCHEMA_FAILED", message).with_details(e.to_string())
}

fn schema_version(conn: &Connection) -> Result<usize, AppError> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| schema_err("Failed to read schema version", e))?;
    usize::try_from(version).map_err(|_| {
        AppError::new("STORAGE_SCHEMA_FAILED", "Stored schema version is negative")
            .with_details(format!("user_version={version}"))
    })
}

/// Bring the kv table up to the latest schema step. Each step commits together with its
/// version bump, so a failed step leaves the previous version in place.
fn upgrade_schema(conn: &mut Connection) -> Result<(), AppError> {
    let current = schema_version(conn)?;
    if current > SCHEMA_STEPS.len() {
        return Err(AppError::new(
            "STORAGE_SCHEMA_FAILED",
            "Storage file was written by a newer version",
        )
        .with_details(format!("user_version={current}")));
    }

    for (idx, sql) in SCHEMA_STEPS.iter().enumerate().skip(current) {
        let target = idx + 1;
        let tx = conn
            .transaction()
            .map_err(|e| schema_err("Failed to start schema transaction", e))?;
        tx.execute_batch(sql)
            .map_err(|e| schema_err("Failed to apply schema step", e))?;
        tx.pragma_update(None, "user_version", target as i64)
            .map_err(|e| schema_err("Failed to record schema version", e))?;
        tx.commit()
            .map_err(|e| schema_err("Failed to commit schema step", e))?;
        tracing::debug!(version = target, "storage schema upgraded");
    }
    Ok(())
}

/// Key-value slots in a single SQLite table.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (creating if needed) the database file at `path` and upgrade its schema.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if path.is_dir() {
            return Err(AppError::new(
                "STORAGE_INVALID_PATH",
                "Storage path must be a file (not a directory)",
            )
            .with_details(path.display().to_string()));
        }
        let mut conn = Connection::open(path).map_err(|e| {
            AppError::new("STORAGE_OPEN_FAILED", "Failed to open SQLite database")
                .with_details(format!("path={}: {}", path.display(), e))
        })?;
        upgrade_schema(&mut conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        self.conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(|e| {
                AppError::new("STORAGE_READ_FAILED", "Failed to read storage slot")
                    .with_details(format!("key={key}: {e}"))
            })
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.conn
            .execute(
                r#"
      INSERT INTO kv_store(key, value, updated_at)
      VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ','now'))
      ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
      "#,
                [key, value],
            )
            .map_err(|e| {
                AppError::new("STORAGE_WRITE_FAILED", "Failed to write storage slot")
                    .with_details(format!("key={key}: {e}"))
                    .with_retryable(true)
            })?;
        Ok(())
    }
}
