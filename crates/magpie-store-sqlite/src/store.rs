//! [`Database`]: the async connection wrapper the application starts with.

use std::{path::Path, sync::Arc, time::Duration};

use magpie_schema::{SchemaDefinition, live::LiveSchema};
use serde::Deserialize;

use crate::{Result, SchemaManager, SyncReport, introspect::introspect};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
  /// How long a writer waits for a competing process to release the
  /// database before failing with `SQLITE_BUSY`.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 { 5_000 }

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      busy_timeout_ms: default_busy_timeout_ms(),
    }
  }
}

// ─── Database ────────────────────────────────────────────────────────────────

/// A MagPie database backed by a single SQLite file.
///
/// All access runs on the [`tokio_rusqlite`] connection thread. Cloning is
/// cheap; clones share the connection.
#[derive(Clone)]
pub struct Database {
  conn: tokio_rusqlite::Connection,
}

impl Database {
  /// Open (or create) the database at `path`.
  ///
  /// The schema is not touched; call [`Database::sync_schema`] before
  /// serving requests.
  pub async fn open(path: impl AsRef<Path>, config: &DatabaseConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let db = Self { conn };
    db.configure(Duration::from_millis(config.busy_timeout_ms)).await?;
    Ok(db)
  }

  /// Open an in-memory database, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let db = Self { conn };
    db.configure(Duration::from_millis(default_busy_timeout_ms())).await?;
    Ok(db)
  }

  async fn configure(&self, busy_timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(
          "PRAGMA journal_mode = WAL;
           PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Reconcile the database with `schema`. Run once at startup, before any
  /// request is served; an error means the schema is not trustworthy and
  /// startup should abort.
  pub async fn sync_schema(&self, schema: Arc<SchemaDefinition>) -> Result<SyncReport> {
    self
      .conn
      .call(move |conn| Ok(SchemaManager::new(conn, &schema).sync_schema()))
      .await?
  }

  /// Current tables and indexes.
  pub async fn snapshot(&self) -> Result<LiveSchema> {
    self.conn.call(|conn| Ok(introspect(conn))).await?
  }

  /// Run `f` on the connection thread.
  pub async fn call<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }
}
