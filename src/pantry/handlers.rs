use axum::{
    extract::State,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::{nutrition::types::PantryItem, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct PantryBody {
    #[serde(default)]
    pub items: Vec<PantryItem>,
}

#[derive(Debug, Deserialize)]
pub struct RemakeForm {
    pub text: String,
}

pub fn pantry_routes() -> Router<AppState> {
    Router::new()
        .route("/pantry", get(get_pantry))
        .route("/pantry/update", post(update_pantry))
        .route("/pantry/remake", post(remake_pantry))
}

#[instrument(skip(state, body))]
pub async fn update_pantry(
    State(state): State<AppState>,
    Json(body): Json<PantryBody>,
) -> Json<Value> {
    debug!(items = body.items.len(), "pantry updated");
    state.nutrition.set_pantry(body.items);
    Json(json!({ "ok": true }))
}

#[instrument(skip(state))]
pub async fn get_pantry(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "pantry": PantryBody { items: state.nutrition.pantry() } }))
}

/// Structures free text into the pantry; falls back to `name: quantity` lines.
#[instrument(skip(state, form))]
pub async fn remake_pantry(
    State(state): State<AppState>,
    Form(form): Form<RemakeForm>,
) -> Json<Value> {
    let items = state.planner.restructure_pantry(&form.text).await;
    Json(json!({ "ok": true, "pantry": PantryBody { items } }))
}
