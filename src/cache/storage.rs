//! Key/value storage trait with SQLite and in-memory implementations.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Trait for persisted key/value backends.
///
/// Values are opaque JSON strings; use the typed helpers on `dyn KeyValueStorage`.
pub trait KeyValueStorage: Send + Sync {
  /// Read the raw value stored under `namespace/key`.
  fn get_raw(&self, namespace: &str, key: &str) -> Result<Option<String>>;

  /// Insert or replace the raw value under `namespace/key`.
  fn put_raw(&self, namespace: &str, key: &str, value: &str) -> Result<()>;

  /// Delete a single key. Deleting a missing key is not an error.
  fn remove(&self, namespace: &str, key: &str) -> Result<()>;

  /// Delete every key in a namespace.
  fn clear_namespace(&self, namespace: &str) -> Result<()>;
}

impl<'a> dyn KeyValueStorage + 'a {
  /// Read and deserialize a value. A value that no longer parses is treated as absent.
  pub fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Result<Option<T>> {
    let Some(raw) = self.get_raw(namespace, key)? else {
      return Ok(None);
    };
    match serde_json::from_str(&raw) {
      Ok(value) => Ok(Some(value)),
      Err(e) => {
        tracing::warn!(namespace, key, error = %e, "discarding unreadable persisted value");
        Ok(None)
      }
    }
  }

  pub fn put<T: Serialize + ?Sized>(&self, namespace: &str, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)
      .map_err(|e| eyre!("Failed to serialize {}/{}: {}", namespace, key, e))?;
    self.put_raw(namespace, key, &raw)
  }
}

/// Storage kept in process memory only.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStorage for MemoryStorage {
  fn get_raw(&self, namespace: &str, key: &str) -> Result<Option<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(&(namespace.to_string(), key.to_string())).cloned())
  }

  fn put_raw(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert((namespace.to_string(), key.to_string()), value.to_string());
    Ok(())
  }

  fn remove(&self, namespace: &str, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.remove(&(namespace.to_string(), key.to_string()));
    Ok(())
  }

  fn clear_namespace(&self, namespace: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.retain(|(ns, _), _| ns != namespace);
    Ok(())
  }
}

/// SQLite-based storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the database file at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create storage directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open storage database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Database that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(KV_SCHEMA)
      .map_err(|e| eyre!("Failed to run storage migrations: {}", e))?;

    Ok(())
  }
}

const KV_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace, key)
);
"#;

impl KeyValueStorage for SqliteStorage {
  fn get_raw(&self, namespace: &str, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_store WHERE namespace = ? AND key = ?",
        params![namespace, key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {}/{}: {}", namespace, key, e))
  }

  fn put_raw(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (namespace, key, value, updated_at)
         VALUES (?, ?, ?, ?)",
        params![namespace, key, value, Utc::now().to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to write {}/{}: {}", namespace, key, e))?;

    Ok(())
  }

  fn remove(&self, namespace: &str, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM kv_store WHERE namespace = ? AND key = ?",
        params![namespace, key],
      )
      .map_err(|e| eyre!("Failed to delete {}/{}: {}", namespace, key, e))?;

    Ok(())
  }

  fn clear_namespace(&self, namespace: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_store WHERE namespace = ?", params![namespace])
      .map_err(|e| eyre!("Failed to clear {}: {}", namespace, e))?;

    Ok(())
  }
}
