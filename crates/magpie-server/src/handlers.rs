//! Handlers for the operational endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/` | Service name, version and status |
//! | `GET`  | `/health` | Liveness |
//! | `GET`  | `/schema` | Startup sync report, live tables, pending changes |

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

/// `GET /`
pub async fn root() -> Json<Value> {
  Json(json!({
    "message": "MagPie Event Registration API",
    "version": env!("CARGO_PKG_VERSION"),
    "status":  "running",
  }))
}

/// `GET /health`
pub async fn health() -> Json<Value> { Json(json!({ "status": "healthy" })) }

/// `GET /schema`: what the startup pass did and what the database holds
/// now. `in_sync` turns false if someone altered the schema since startup
/// in a way the next boot would repair.
pub async fn schema(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
  let live = state.db.snapshot().await?;
  let pending = magpie_schema::plan(&state.schema, &live);

  Ok(Json(json!({
    "fingerprint": state.schema.fingerprint(),
    "in_sync":     pending.is_empty(),
    "pending":     pending,
    "last_sync":   &*state.last_sync,
    "live":        live,
  })))
}
