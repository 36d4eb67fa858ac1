use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::{db, AppState};

/// Liveness plus a database ping.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => "up",
        Err(_) => "down",
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    }))
}
