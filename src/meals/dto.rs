use serde::{Deserialize, Serialize};

use crate::llm::{ErrorBody, GenerationError};
use crate::nutrition::clarification::Clarification;
use crate::nutrition::types::{Macros, Meal, PantryItem};

/// Where a plan-generation attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    ProfileMissing,
    NeedClarification(Clarification),
    LlmError(GenerationError),
    Complete(Vec<Meal>),
}

impl PlanOutcome {
    pub fn state(&self) -> &'static str {
        match self {
            Self::ProfileMissing => "PROFILE_MISSING",
            Self::NeedClarification(_) => "NEED_CLARIFICATION",
            Self::LlmError(_) => "LLM_ERROR",
            Self::Complete(_) => "COMPLETE",
        }
    }
}

/// Result of a single-meal request (substitution or snack).
#[derive(Debug, Clone, PartialEq)]
pub enum MealOutcome {
    ProfileMissing,
    LlmError(GenerationError),
    Meal(Meal),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealLog {
    pub deducted: Vec<String>,
    pub macros: Macros,
    pub totals: Macros,
    pub pantry: Vec<PantryItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodLog {
    pub macros: Macros,
    pub totals: Macros,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default = "default_slot")]
    pub slot: String,
}
fn default_slot() -> String { "Lunch".into() }

#[derive(Debug, Deserialize)]
pub struct SnackQuery {
    #[serde(default = "default_max_calories")]
    pub max_calories: u32,
}
fn default_max_calories() -> u32 { 300 }

#[derive(Debug, Deserialize)]
pub struct CustomFoodRequest {
    pub free_text: String,
}
