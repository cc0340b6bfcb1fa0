use crate::nutrition::types::{PantryItem, Profile};

const MEAL_OBJECT_SCHEMA: &str = r#"{"dish_name": string,
  "macros": {"protein": number, "carbs": number, "fat": number},
  "ingredients": [{"item": string, "quantity": string}],
  "recipe_steps": [string],
  "video_link": string|null}"#;

fn context(profile: &Profile, pantry: &[PantryItem]) -> String {
    let profile = serde_json::to_string(profile).unwrap_or_default();
    let pantry = serde_json::to_string(&serde_json::json!({ "items": pantry })).unwrap_or_default();
    format!("Profile: {profile}\nPantry: {pantry}")
}

pub fn day_plan(profile: &Profile, pantry: &[PantryItem]) -> String {
    format!(
        r#"You are a nutrition assistant. For the profile JSON and pantry JSON, return EXACT JSON array of 3 meals (Breakfast, Lunch, Dinner).
Each meal object must contain:
- dish_name (string)
- macros (object grams): {{"protein": number, "carbs": number, "fat": number}}
- ingredients (array): [{{"item": string, "quantity": string}}]
- recipe_steps (array of strings)
- video_link (string or null)

{}
Return ONLY the JSON array."#,
        context(profile, pantry)
    )
}

pub fn single_meal(slot: &str, profile: &Profile, pantry: &[PantryItem]) -> String {
    format!(
        "Return ONE JSON meal object for slot \"{slot}\" using schema:\n{MEAL_OBJECT_SCHEMA}\n{}\nReturn ONLY the JSON object.",
        context(profile, pantry)
    )
}

pub fn snack(max_calories: u32, profile: &Profile, pantry: &[PantryItem]) -> String {
    format!(
        "Return ONE JSON meal object (snack) with total calories <= {max_calories}. Keep quick/simple.\nSchema:\n{MEAL_OBJECT_SCHEMA}\n{}\nReturn ONLY the JSON object.",
        context(profile, pantry)
    )
}

pub fn structure_pantry(text: &str) -> String {
    format!(
        r#"Structure the following free-text pantry/fridge inventory into JSON with schema:
{{"items": [{{"name": string, "quantity": string}}]}}
Return ONLY the JSON object.

Input:
{text}"#
    )
}

pub fn estimate_macros(food: &str) -> String {
    format!(
        r#"Estimate macronutrients in grams for: "{food}".
Return ONLY a JSON object:
{{"protein": number, "carbs": number, "fat": number}}"#
    )
}
