//! MagPie server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `MAGPIE_*` environment variables, opens the SQLite database, reconciles
//! its schema, and only then starts serving HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use magpie_schema::catalog;
use magpie_server::{AppState, ServerConfig};
use magpie_store_sqlite::Database;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "MagPie event registration backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Reconcile the database schema and exit.
  #[arg(long)]
  sync_only: bool,

  /// Print pending schema changes as JSON and exit without writing.
  #[arg(long, conflicts_with = "sync_only")]
  plan: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MAGPIE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let schema = Arc::new(catalog::event_registration().context("invalid schema catalog")?);

  let db_path = expand_tilde(&server_cfg.database_path);
  let db = Database::open(&db_path, &server_cfg.database())
    .await
    .with_context(|| format!("failed to open database at {db_path:?}"))?;

  if cli.plan {
    let live = db.snapshot().await.context("failed to read live schema")?;
    let pending = magpie_schema::plan(&schema, &live);
    println!("{}", serde_json::to_string_pretty(&pending)?);
    return Ok(());
  }

  let report = db
    .sync_schema(schema.clone())
    .await
    .context("database schema sync failed, refusing to start")?;

  if cli.sync_only {
    return Ok(());
  }

  let state = AppState {
    db,
    schema,
    last_sync: Arc::new(report),
  };

  let app = magpie_server::router(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
