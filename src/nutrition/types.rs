use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Preferred meal times, `HH:MM` per slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealTimes {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
}

impl MealTimes {
    /// All three slots, or `None` when any is missing or null.
    pub fn from_map(map: &Map<String, Value>) -> Option<Self> {
        let slot = |key: &str| match map.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };
        Some(Self {
            breakfast: slot("breakfast")?,
            lunch: slot("lunch")?,
            dinner: slot("dinner")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub goal: String,
    #[serde(default)]
    pub restrictions: BTreeSet<String>,
    #[serde(default)]
    pub allergies: BTreeSet<String>,
    pub activity: String,
    /// Empty or partial maps read as unset, so the clarification gate asks for them.
    #[serde(default, deserialize_with = "lenient_meal_times")]
    pub meal_times: Option<MealTimes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantryItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quantity: String,
}

impl PantryItem {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }
}

/// Grams of protein, carbs and fat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Macros {
    #[cfg(test)]
    pub fn new(protein: f64, carbs: f64, fat: f64) -> Self {
        Self { protein, carbs, fat }
    }

    /// Reads macros from generator output: numbers or numeric strings, anything else is zero.
    pub fn from_generated(value: &Value) -> Self {
        Self {
            protein: lenient_grams(value.get("protein")),
            carbs: lenient_grams(value.get("carbs")),
            fat: lenient_grams(value.get("fat")),
        }
    }

    /// Negative and non-finite values become zero.
    pub fn clamped(self) -> Self {
        let clamp = |g: f64| if g.is_finite() && g > 0.0 { g } else { 0.0 };
        Self {
            protein: clamp(self.protein),
            carbs: clamp(self.carbs),
            fat: clamp(self.fat),
        }
    }

    pub fn add(&mut self, delta: Macros) {
        self.protein += delta.protein;
        self.carbs += delta.carbs;
        self.fat += delta.fat;
    }
}

fn lenient_grams(value: Option<&Value>) -> f64 {
    let grams = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if grams.is_finite() && grams > 0.0 {
        grams
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default, deserialize_with = "lenient_string")]
    pub item: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub dish_name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub macros: Macros,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub recipe_steps: Vec<String>,
    #[serde(default)]
    pub video_link: Option<String>,
}

/// Loose shape of a meal as the generator emits it.
#[derive(Debug, Default, Deserialize)]
struct GeneratedMeal {
    #[serde(default, deserialize_with = "lenient_string")]
    dish_name: String,
    #[serde(default)]
    image: Option<Value>,
    #[serde(default)]
    macros: Value,
    #[serde(default)]
    ingredients: Value,
    #[serde(default)]
    recipe_steps: Value,
    #[serde(default)]
    video_link: Option<Value>,
}

impl Meal {
    /// Builds a meal from one generated object; `None` if the value is not an object.
    pub fn from_generated(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let raw: GeneratedMeal = serde_json::from_value(value.clone()).unwrap_or_default();
        let text = |v: &Value| match v {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let list = |v: &Value| v.as_array().cloned().unwrap_or_default();
        let ingredients = list(&raw.ingredients)
            .into_iter()
            .filter_map(|v| serde_json::from_value::<Ingredient>(v).ok())
            .collect();
        Some(Self {
            dish_name: raw.dish_name,
            image: raw.image.as_ref().map(text).filter(|s| !s.is_empty()),
            macros: Macros::from_generated(&raw.macros),
            ingredients,
            recipe_steps: list(&raw.recipe_steps).iter().map(text).collect(),
            video_link: raw.video_link.as_ref().map(text).filter(|s| !s.is_empty()),
        })
    }
}

/// Daily goals shown next to the running totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            calories: 1500.0,
            protein: 70.0,
            carbs: 70.0,
            fat: 200.0,
        }
    }
}

/// Accepts strings, numbers and booleans; null becomes empty.
fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_meal_times<'de, D>(de: D) -> Result<Option<MealTimes>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_object)
        .and_then(MealTimes::from_map))
}
