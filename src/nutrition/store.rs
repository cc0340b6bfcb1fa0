use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use thiserror::Error;
use time::Date;
use tracing::{debug, info, warn};

use super::types::{Macros, Meal, MealTimes, PantryItem, Profile, Targets};
use crate::llm::{prompts, GenerationClient};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("profile_missing")]
    ProfileMissing,
    #[error("{0}")]
    ValidationFailed(String),
}

#[derive(Debug, Default)]
struct Inner {
    profile: Option<Profile>,
    pantry: Vec<PantryItem>,
    plans: HashMap<Date, Vec<Meal>>,
    totals: HashMap<Date, Macros>,
    targets: Targets,
}

/// Result of logging an eaten meal, taken inside one critical section.
#[derive(Debug, Clone, PartialEq)]
pub struct Deduction {
    pub remaining: Vec<PantryItem>,
    pub deducted: Vec<String>,
    pub totals: Macros,
}

/// Process-wide nutrition and pantry state.
///
/// Every operation takes the lock exactly once, so read-modify-write sequences
/// never interleave. Callers finish any network I/O before calling in.
#[derive(Debug, Default)]
pub struct NutritionState {
    inner: RwLock<Inner>,
}

impl NutritionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_profile(&self, profile: Profile) {
        self.write().profile = Some(profile);
    }

    pub fn profile(&self) -> Option<Profile> {
        self.read().profile.clone()
    }

    /// Profile and pantry read together, as one consistent snapshot.
    pub fn planning_context(&self) -> (Option<Profile>, Vec<PantryItem>) {
        let inner = self.read();
        (inner.profile.clone(), inner.pantry.clone())
    }

    pub fn set_pantry(&self, items: Vec<PantryItem>) {
        self.write().pantry = items;
    }

    pub fn pantry(&self) -> Vec<PantryItem> {
        self.read().pantry.clone()
    }

    /// Structures free text into pantry items and replaces the pantry with them.
    ///
    /// Falls back to `name: quantity` line parsing when generation fails.
    pub async fn replace_pantry_from_text(
        &self,
        client: &GenerationClient,
        text: &str,
    ) -> Vec<PantryItem> {
        let items = match client.generate_structured(&prompts::structure_pantry(text)).await {
            Ok(value) => pantry_from_generated(&value).unwrap_or_else(|| {
                warn!("generated pantry had an unexpected shape; parsing lines");
                parse_pantry_lines(text)
            }),
            Err(e) => {
                warn!(error = %e, "pantry structuring failed; parsing lines");
                parse_pantry_lines(text)
            }
        };
        info!(items = items.len(), "pantry replaced from text");
        self.set_pantry(items.clone());
        items
    }

    pub fn set_plan(&self, date: Date, meals: Vec<Meal>) {
        self.write().plans.insert(date, meals);
    }

    pub fn plan_for(&self, date: Date) -> Option<Vec<Meal>> {
        self.read().plans.get(&date).cloned()
    }

    /// Removes pantry items whose names approximately match the meal's ingredients.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn deduct_for_meal(&self, meal: &Meal) -> (Vec<PantryItem>, Vec<String>) {
        let mut inner = self.write();
        let deducted = deduct(&mut inner.pantry, meal);
        (inner.pantry.clone(), deducted)
    }

    /// Adds a non-negative delta to the date's totals, creating the entry if needed.
    pub fn accumulate_macros(&self, date: Date, delta: Macros) -> Macros {
        let mut inner = self.write();
        accumulate(&mut inner.totals, date, delta)
    }

    /// Pantry deduction and macro accumulation as one atomic step.
    pub fn log_meal(&self, date: Date, meal: &Meal) -> Deduction {
        let mut inner = self.write();
        let deducted = deduct(&mut inner.pantry, meal);
        let totals = accumulate(&mut inner.totals, date, meal.macros);
        Deduction {
            remaining: inner.pantry.clone(),
            deducted,
            totals,
        }
    }

    pub fn totals(&self, date: Date) -> Macros {
        self.read().totals.get(&date).copied().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn has_totals(&self, date: Date) -> bool {
        self.read().totals.contains_key(&date)
    }

    pub fn targets(&self) -> Targets {
        self.read().targets
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn set_targets(&self, targets: Targets) {
        self.write().targets = targets;
    }

    /// Stores meal times from `{"breakfast",..}` or `{"meal_times": {..}}` into the profile.
    pub fn resolve_clarification(&self, payload: &Value) -> Result<MealTimes, StateError> {
        let meal_times = meal_times_from_payload(payload)?;
        let mut inner = self.write();
        let profile = inner.profile.as_mut().ok_or(StateError::ProfileMissing)?;
        profile.meal_times = Some(meal_times.clone());
        info!(profile = %profile.name, "meal times resolved");
        Ok(meal_times)
    }
}

fn deduct(pantry: &mut Vec<PantryItem>, meal: &Meal) -> Vec<String> {
    let ingredients: Vec<String> = meal
        .ingredients
        .iter()
        .map(|i| i.item.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();
    let mut deducted = Vec::new();
    pantry.retain(|item| {
        let name = item.name.trim().to_lowercase();
        // Substring match either way; "egg" also hits "eggplant".
        let hit = !name.is_empty()
            && ingredients
                .iter()
                .any(|k| k.contains(name.as_str()) || name.contains(k.as_str()));
        if hit {
            deducted.push(item.name.clone());
        }
        !hit
    });
    debug!(deducted = deducted.len(), left = pantry.len(), "pantry deducted");
    deducted
}

fn accumulate(totals: &mut HashMap<Date, Macros>, date: Date, delta: Macros) -> Macros {
    let day = totals.entry(date).or_default();
    day.add(delta.clamped());
    *day
}

fn meal_times_from_payload(payload: &Value) -> Result<MealTimes, StateError> {
    let Some(obj) = payload.as_object() else {
        return Err(StateError::ValidationFailed("invalid_payload".into()));
    };
    MealTimes::from_map(obj)
        .or_else(|| {
            obj.get("meal_times")
                .and_then(Value::as_object)
                .and_then(MealTimes::from_map)
        })
        .ok_or_else(|| StateError::ValidationFailed("meal_times_missing".into()))
}

/// Accepts `{"items": [...]}` or a bare array.
fn pantry_from_generated(value: &Value) -> Option<Vec<PantryItem>> {
    value
        .get("items")
        .unwrap_or(value)
        .as_array()?
        .iter()
        .map(|item| serde_json::from_value::<PantryItem>(item.clone()).ok())
        .collect()
}

/// `name: quantity` per line; lines without a colon are skipped.
pub fn parse_pantry_lines(text: &str) -> Vec<PantryItem> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, quantity)| PantryItem::new(name.trim(), quantity.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::client::test_support::ScriptedGenerator;
    use crate::nutrition::types::Ingredient;
    use serde_json::json;
    use time::macros::date;

    fn meal_with(ingredients: &[&str], macros: Macros) -> Meal {
        Meal {
            dish_name: "test".into(),
            image: None,
            macros,
            ingredients: ingredients
                .iter()
                .map(|i| Ingredient {
                    item: i.to_string(),
                    quantity: "1".into(),
                })
                .collect(),
            recipe_steps: vec![],
            video_link: None,
        }
    }

    fn profile() -> Profile {
        serde_json::from_value(json!({
            "name": "Ana", "age": 31, "gender": "f", "height": 165.0, "weight": 60.0,
            "goal": "maintain", "activity": "moderate"
        }))
        .unwrap()
    }

    #[test]
    fn deduct_matches_substrings_case_insensitively() {
        let state = NutritionState::new();
        state.set_pantry(vec![PantryItem::new("eggs", "6"), PantryItem::new("milk", "1L")]);
        let (remaining, deducted) = state.deduct_for_meal(&meal_with(&["Egg"], Macros::default()));
        assert_eq!(deducted, vec!["eggs".to_string()]);
        assert_eq!(remaining, vec![PantryItem::new("milk", "1L")]);
        assert_eq!(state.pantry(), remaining);
    }

    #[test]
    fn deduct_matches_in_both_directions_and_removes_duplicates() {
        let state = NutritionState::new();
        state.set_pantry(vec![
            PantryItem::new("rice", "1kg"),
            PantryItem::new("Rice", "500g"),
            PantryItem::new("oil", "1 bottle"),
        ]);
        let (remaining, deducted) =
            state.deduct_for_meal(&meal_with(&["brown rice"], Macros::default()));
        assert_eq!(deducted, vec!["rice".to_string(), "Rice".to_string()]);
        assert_eq!(remaining, vec![PantryItem::new("oil", "1 bottle")]);
    }

    #[test]
    fn blank_names_never_match() {
        let state = NutritionState::new();
        state.set_pantry(vec![PantryItem::new("", "?"), PantryItem::new("tofu", "1")]);
        let (remaining, deducted) = state.deduct_for_meal(&meal_with(&["  "], Macros::default()));
        assert!(deducted.is_empty());
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn totals_accumulate_and_clamp_negatives() {
        let state = NutritionState::new();
        let day = date!(2025 - 03 - 01);
        assert_eq!(state.totals(day), Macros::default());
        state.accumulate_macros(day, Macros::new(10.0, 20.0, 5.0));
        let totals = state.accumulate_macros(day, Macros::new(-4.0, 1.0, 1.0));
        assert_eq!(totals, Macros::new(10.0, 21.0, 6.0));
        assert_eq!(state.totals(date!(2025 - 03 - 02)), Macros::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_accumulation_loses_no_updates() {
        let state = Arc::new(NutritionState::new());
        let day = date!(2025 - 03 - 01);
        let n = 200;
        let tasks: Vec<_> = (0..n)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    state.accumulate_macros(day, Macros::new(1.0, 1.0, 1.0));
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
        let expected = n as f64;
        assert_eq!(state.totals(day), Macros::new(expected, expected, expected));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_meal_logs_keep_every_increment() {
        let state = Arc::new(NutritionState::new());
        let day = date!(2025 - 03 - 01);
        state.set_pantry(vec![PantryItem::new("oats", "1kg")]);
        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    state.log_meal(day, &meal_with(&["oats"], Macros::new(2.0, 3.0, 1.0)))
                })
            })
            .collect();
        let mut deducted = 0;
        for t in tasks {
            deducted += t.await.unwrap().deducted.len();
        }
        assert_eq!(deducted, 1);
        assert_eq!(state.totals(day), Macros::new(100.0, 150.0, 50.0));
    }

    #[test]
    fn plan_is_replaced_wholesale() {
        let state = NutritionState::new();
        let day = date!(2025 - 03 - 01);
        assert!(state.plan_for(day).is_none());
        state.set_plan(day, vec![meal_with(&[], Macros::default()); 3]);
        let mut second = meal_with(&[], Macros::default());
        second.dish_name = "second".into();
        state.set_plan(day, vec![second.clone(), second.clone(), second]);
        let plan = state.plan_for(day).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|m| m.dish_name == "second"));
    }

    #[test]
    fn resolve_clarification_accepts_flat_and_nested() {
        let state = NutritionState::new();
        state.set_profile(profile());
        let flat = state
            .resolve_clarification(&json!({"breakfast": "08:00", "lunch": "13:00", "dinner": "19:00"}))
            .unwrap();
        assert_eq!(flat.lunch, "13:00");
        let nested = state
            .resolve_clarification(&json!({"meal_times": {"breakfast": "07:00", "lunch": "12:00", "dinner": 18}}))
            .unwrap();
        assert_eq!(nested.dinner, "18");
        assert_eq!(state.profile().unwrap().meal_times, Some(nested));
    }

    #[test]
    fn resolve_clarification_validates_payload() {
        let state = NutritionState::new();
        state.set_profile(profile());
        assert_eq!(
            state.resolve_clarification(&json!({"breakfast": "08:00", "lunch": "13:00"})),
            Err(StateError::ValidationFailed("meal_times_missing".into()))
        );
        assert_eq!(
            state.resolve_clarification(&json!(["08:00"])),
            Err(StateError::ValidationFailed("invalid_payload".into()))
        );
        assert!(state.profile().unwrap().meal_times.is_none());
    }

    #[test]
    fn resolve_clarification_requires_profile() {
        let state = NutritionState::new();
        assert_eq!(
            state.resolve_clarification(&json!({"breakfast": "8", "lunch": "1", "dinner": "7"})),
            Err(StateError::ProfileMissing)
        );
    }

    #[test]
    fn line_parse_splits_on_first_colon() {
        let items = parse_pantry_lines("eggs: 6\nno separator here\n milk : 1L \ntime: 10:30");
        assert_eq!(
            items,
            vec![
                PantryItem::new("eggs", "6"),
                PantryItem::new("milk", "1L"),
                PantryItem::new("time", "10:30"),
            ]
        );
    }

    #[tokio::test]
    async fn pantry_from_text_uses_generated_items() {
        let state = NutritionState::new();
        let gen = ScriptedGenerator::replying(&[
            r#"{"items": [{"name": "eggs", "quantity": 6}, {"name": "spinach", "quantity": "1 bag"}]}"#,
        ]);
        let items = state
            .replace_pantry_from_text(&GenerationClient::new(gen), "six eggs and a bag of spinach")
            .await;
        assert_eq!(
            items,
            vec![PantryItem::new("eggs", "6"), PantryItem::new("spinach", "1 bag")]
        );
        assert_eq!(state.pantry(), items);
    }

    #[tokio::test]
    async fn pantry_from_text_falls_back_to_lines() {
        let state = NutritionState::new();
        state.set_pantry(vec![PantryItem::new("old", "1")]);
        let items = state
            .replace_pantry_from_text(&GenerationClient::disabled(), "eggs: 6\nbread")
            .await;
        assert_eq!(items, vec![PantryItem::new("eggs", "6")]);

        let gen = ScriptedGenerator::replying(&[r#"{"pantry": []}"#]);
        let items = state
            .replace_pantry_from_text(&GenerationClient::new(gen), "tea: 20 bags")
            .await;
        assert_eq!(items, vec![PantryItem::new("tea", "20 bags")]);
        assert_eq!(state.pantry(), items);
    }

    #[tokio::test]
    async fn pantry_from_text_accepts_bare_array() {
        let state = NutritionState::new();
        let gen = ScriptedGenerator::replying(&[r#"[{"name": "oats", "quantity": "500g"}]"#]);
        let items = state
            .replace_pantry_from_text(&GenerationClient::new(gen), "half a kilo of oats")
            .await;
        assert_eq!(items, vec![PantryItem::new("oats", "500g")]);
    }

    #[test]
    fn targets_default_and_override() {
        let state = NutritionState::new();
        assert_eq!(state.targets(), Targets::default());
        let custom = Targets {
            calories: 2000.0,
            protein: 120.0,
            carbs: 180.0,
            fat: 60.0,
        };
        state.set_targets(custom);
        assert_eq!(state.targets(), custom);
    }
}
