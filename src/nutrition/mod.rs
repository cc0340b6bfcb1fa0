pub mod clarification;
pub mod store;
pub mod types;

pub use store::NutritionState;
