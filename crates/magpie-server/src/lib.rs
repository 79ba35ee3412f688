//! HTTP front of the MagPie registration backend.
//!
//! The router is only built once the database schema has been reconciled;
//! [`AppState`] carries the report of that pass so operators can inspect it
//! at `GET /schema`.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use magpie_schema::SchemaDefinition;
use magpie_store_sqlite::{Database, DatabaseConfig, SyncReport};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, from `config.toml` and `MAGPIE_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_database_path")]
  pub database_path:   PathBuf,
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8000 }

fn default_database_path() -> PathBuf { PathBuf::from("magpie.db") }

fn default_busy_timeout_ms() -> u64 { DatabaseConfig::default().busy_timeout_ms }

impl ServerConfig {
  pub fn database(&self) -> DatabaseConfig {
    DatabaseConfig {
      busy_timeout_ms: self.busy_timeout_ms,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState {
  pub db:        Database,
  pub schema:    Arc<SchemaDefinition>,
  /// Outcome of the startup reconciliation.
  pub last_sync: Arc<SyncReport>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(handlers::root))
    .route("/health", get(handlers::health))
    .route("/schema", get(handlers::schema))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
