use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use super::dto::{CustomFoodRequest, FoodLog, MealOutcome, PlanOutcome, SnackQuery, SuggestQuery};
use crate::{nutrition::types::Meal, state::AppState};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/recommendations", get(recommendations))
        .route("/plan/today", get(today_plan))
        .route("/meals/suggest_another", get(suggest_another))
        .route("/meals/recommend_snack", get(recommend_snack))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/log_eaten", post(log_eaten))
        .route("/meals/log_custom", post(log_custom))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn recommendations(State(state): State<AppState>) -> Json<Value> {
    Json(plan_body(state.planner.generate_plan().await))
}

#[instrument(skip(state))]
pub async fn today_plan(State(state): State<AppState>) -> Json<Value> {
    let (date, meals) = state.planner.today_plan();
    Json(json!({ "date": date.to_string(), "meals": meals }))
}

/// GET /meals/suggest_another?slot=Lunch
#[instrument(skip(state))]
pub async fn suggest_another(
    State(state): State<AppState>,
    Query(q): Query<SuggestQuery>,
) -> Json<Value> {
    Json(meal_body(state.planner.suggest_alternative(&q.slot).await))
}

/// GET /meals/recommend_snack?max_calories=300
#[instrument(skip(state))]
pub async fn recommend_snack(
    State(state): State<AppState>,
    Query(q): Query<SnackQuery>,
) -> Json<Value> {
    Json(meal_body(state.planner.recommend_snack(q.max_calories).await))
}

#[instrument(skip(state, meal))]
pub async fn log_eaten(State(state): State<AppState>, Json(meal): Json<Meal>) -> Json<Value> {
    let log = state.planner.log_eaten_meal(&meal);
    Json(json!({
        "ok": true,
        "deducted": log.deducted,
        "macros": log.macros,
        "totals": log.totals,
        "pantry": { "items": log.pantry },
    }))
}

#[instrument(skip(state, body))]
pub async fn log_custom(
    State(state): State<AppState>,
    Json(body): Json<CustomFoodRequest>,
) -> Json<FoodLog> {
    Json(state.planner.log_free_text_food(&body.free_text).await)
}

fn plan_body(outcome: PlanOutcome) -> Value {
    let state = outcome.state();
    match outcome {
        PlanOutcome::ProfileMissing => json!({ "error": "profile_missing" }),
        PlanOutcome::NeedClarification(clarification) => {
            json!({ "state": state, "clarification": clarification })
        }
        PlanOutcome::LlmError(e) => json!({ "state": state, "error": e.to_body() }),
        PlanOutcome::Complete(meals) => json!({ "state": state, "meals": meals }),
    }
}

fn meal_body(outcome: MealOutcome) -> Value {
    match outcome {
        MealOutcome::ProfileMissing => json!({ "error": "profile_missing" }),
        MealOutcome::LlmError(e) => json!({ "error": e.to_body() }),
        MealOutcome::Meal(meal) => json!({ "meal": meal }),
    }
}
