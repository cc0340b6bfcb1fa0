use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    nutrition::types::Profile,
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/user/profile", post(upsert_profile).get(get_profile))
}

pub fn clarification_routes() -> Router<AppState> {
    Router::new().route("/clarifications/resolve", post(resolve_clarification))
}

#[instrument(skip(state, profile))]
pub async fn upsert_profile(
    State(state): State<AppState>,
    Json(profile): Json<Profile>,
) -> Json<Value> {
    info!(name = %profile.name, has_meal_times = profile.meal_times.is_some(), "profile stored");
    state.nutrition.set_profile(profile);
    Json(json!({ "ok": true }))
}

#[instrument(skip(state))]
pub async fn get_profile(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "profile": state.nutrition.profile() }))
}

/// Accepts `{"breakfast":"08:00",...}` or `{"meal_times": {...}}`.
#[instrument(skip(state, payload))]
pub async fn resolve_clarification(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    match state.nutrition.resolve_clarification(&payload) {
        Ok(meal_times) => Json(json!({ "ok": true, "meal_times": meal_times })),
        Err(e) => {
            warn!(error = %e, "clarification rejected");
            Json(json!({ "ok": false, "error": e.to_string() }))
        }
    }
}
