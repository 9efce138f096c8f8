//! [`SqliteStateStore`] — the SQLite implementation of [`StateStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use nowpage_core::state::{StateKey, StateStore};

use crate::{Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Local state backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStateStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStateStore {
  /// Open (or create) a store at `path`, creating parent directories, and
  /// run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent).await?;
    }
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened local state");
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── StateStore impl ─────────────────────────────────────────────────────────

impl StateStore for SqliteStateStore {
  type Error = crate::Error;

  async fn load(&self, key: StateKey) -> Result<Option<String>> {
    let key_str = key.as_ref().to_owned();

    let value = self
      .conn
      .call(move |conn| {
        let value: Option<String> = conn
          .query_row(
            "SELECT value FROM local_state WHERE key = ?1",
            rusqlite::params![key_str],
            |r| r.get(0),
          )
          .optional()?;
        Ok(value)
      })
      .await?;
    Ok(value)
  }

  async fn save(&self, key: StateKey, value: &str) -> Result<()> {
    let key_str = key.as_ref().to_owned();
    let value   = value.to_owned();
    let at_str  = Utc::now().to_rfc3339();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO local_state (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = excluded.updated_at",
          rusqlite::params![key_str, value, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear(&self, key: StateKey) -> Result<()> {
    let key_str = key.as_ref().to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM local_state WHERE key = ?1",
          rusqlite::params![key_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
