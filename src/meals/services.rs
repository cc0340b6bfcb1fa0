use std::sync::Arc;

use serde_json::Value;
use time::{Date, OffsetDateTime};
use tracing::{info, instrument, warn};

use super::dto::{FoodLog, MealLog, MealOutcome, PlanOutcome};
use crate::images::ImageResolver;
use crate::llm::{prompts, GenerationClient, GenerationError};
use crate::nutrition::clarification;
use crate::nutrition::types::{Macros, Meal, PantryItem, Profile};
use crate::nutrition::NutritionState;

pub const MEALS_PER_DAY: usize = 3;

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Composes generation, image resolution and state updates into the planning operations.
#[derive(Clone)]
pub struct Planner {
    state: Arc<NutritionState>,
    llm: GenerationClient,
    images: ImageResolver,
}

impl Planner {
    pub fn new(state: Arc<NutritionState>, llm: GenerationClient, images: ImageResolver) -> Self {
        Self { state, llm, images }
    }

    #[cfg(test)]
    pub fn state(&self) -> &Arc<NutritionState> {
        &self.state
    }

    pub fn generation_configured(&self) -> bool {
        self.llm.is_configured()
    }

    /// Generates and stores today's three meals.
    ///
    /// The profile and meal-time checks run before any upstream call; on
    /// failure the stored plan is left as it was.
    #[instrument(skip(self))]
    pub async fn generate_plan(&self) -> PlanOutcome {
        let (profile, pantry) = self.state.planning_context();
        let Some(profile) = profile else {
            return PlanOutcome::ProfileMissing;
        };
        if let Some(clar) = clarification::check(&profile) {
            info!("plan blocked on clarification");
            return PlanOutcome::NeedClarification(clar);
        }

        let value = match self.llm.generate_structured(&prompts::day_plan(&profile, &pantry)).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "plan generation failed");
                return PlanOutcome::LlmError(e);
            }
        };
        let meals = match meals_from_plan(&value) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "plan had an unexpected shape");
                return PlanOutcome::LlmError(e);
            }
        };

        let meals = self.with_images(meals).await;
        let day = today();
        self.state.set_plan(day, meals.clone());
        info!(%day, "daily plan stored");
        PlanOutcome::Complete(meals)
    }

    pub fn today_plan(&self) -> (Date, Option<Vec<Meal>>) {
        let day = today();
        (day, self.state.plan_for(day))
    }

    /// One replacement meal for `slot`. Not written into the stored plan.
    #[instrument(skip(self))]
    pub async fn suggest_alternative(&self, slot: &str) -> MealOutcome {
        self.single_meal(|profile, pantry| prompts::single_meal(slot, profile, pantry))
            .await
    }

    /// A snack under `max_calories`. Not written into the stored plan.
    #[instrument(skip(self))]
    pub async fn recommend_snack(&self, max_calories: u32) -> MealOutcome {
        self.single_meal(|profile, pantry| prompts::snack(max_calories, profile, pantry))
            .await
    }

    async fn single_meal<F>(&self, prompt: F) -> MealOutcome
    where
        F: FnOnce(&Profile, &[PantryItem]) -> String,
    {
        let (profile, pantry) = self.state.planning_context();
        let Some(profile) = profile else {
            return MealOutcome::ProfileMissing;
        };
        let value = match self.llm.generate_structured(&prompt(&profile, &pantry)).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "meal generation failed");
                return MealOutcome::LlmError(e);
            }
        };
        let Some(mut meal) = Meal::from_generated(&value) else {
            return MealOutcome::LlmError(GenerationError::UnexpectedShape {
                detail: "expected a meal object".into(),
            });
        };
        meal.image = Some(
            self.images
                .resolve(Some(meal.dish_name.as_str()), meal.image.as_deref())
                .await,
        );
        MealOutcome::Meal(meal)
    }

    /// Deducts matching pantry items and adds the meal's macros to today's totals.
    #[instrument(skip(self, meal), fields(dish = %meal.dish_name))]
    pub fn log_eaten_meal(&self, meal: &Meal) -> MealLog {
        let outcome = self.state.log_meal(today(), meal);
        info!(deducted = ?outcome.deducted, "meal logged");
        MealLog {
            deducted: outcome.deducted,
            macros: meal.macros.clamped(),
            totals: outcome.totals,
            pantry: outcome.remaining,
        }
    }

    /// Estimates macros for free text and adds them to today's totals.
    ///
    /// Estimation failures count as zero macros; the totals entry is still recorded.
    #[instrument(skip(self))]
    pub async fn log_free_text_food(&self, text: &str) -> FoodLog {
        let (macros, error) = match self.llm.generate_structured(&prompts::estimate_macros(text)).await {
            Ok(value) => (Macros::from_generated(&value), None),
            Err(e) => {
                warn!(error = %e, "macro estimation failed; logging zeros");
                (Macros::default(), Some(e.to_body()))
            }
        };
        let totals = self.state.accumulate_macros(today(), macros);
        FoodLog {
            macros,
            totals,
            error,
        }
    }

    /// Replaces the pantry from free text.
    pub async fn restructure_pantry(&self, text: &str) -> Vec<PantryItem> {
        self.state.replace_pantry_from_text(&self.llm, text).await
    }

    async fn with_images(&self, mut meals: Vec<Meal>) -> Vec<Meal> {
        for meal in &mut meals {
            let url = self
                .images
                .resolve(Some(meal.dish_name.as_str()), meal.image.as_deref())
                .await;
            meal.image = Some(url);
        }
        meals
    }
}

fn meals_from_plan(value: &Value) -> Result<Vec<Meal>, GenerationError> {
    let Some(items) = value.as_array() else {
        return Err(GenerationError::UnexpectedShape {
            detail: "expected a JSON array of meals".into(),
        });
    };
    let mut meals = items
        .iter()
        .filter_map(Meal::from_generated)
        .collect::<Vec<_>>();
    if meals.len() < MEALS_PER_DAY {
        return Err(GenerationError::UnexpectedShape {
            detail: format!("expected {MEALS_PER_DAY} meals, got {}", meals.len()),
        });
    }
    if meals.len() > MEALS_PER_DAY {
        warn!(got = meals.len(), "plan had extra meals; keeping the first three");
        meals.truncate(MEALS_PER_DAY);
    }
    Ok(meals)
}
