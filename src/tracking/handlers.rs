use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::instrument;

use crate::{meals::services::today, state::AppState};

pub fn macros_routes() -> Router<AppState> {
    Router::new()
        .route("/macros/targets", get(targets))
        .route("/macros/today", get(today_totals))
}

#[instrument(skip(state))]
pub async fn targets(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "targets": state.nutrition.targets() }))
}

/// Today's accumulated macros next to the daily targets.
#[instrument(skip(state))]
pub async fn today_totals(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "totals": state.nutrition.totals(today()),
        "targets": state.nutrition.targets(),
    }))
}
