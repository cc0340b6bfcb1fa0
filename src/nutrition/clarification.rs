use serde::Serialize;

use super::types::Profile;

pub const MEAL_TIMES_GUIDANCE: &str =
    "Please provide preferred meal times (HH:MM) for breakfast, lunch, and dinner.";

/// A request for an input the user must supply before planning can continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clarification {
    pub step: u32,
    pub user_guidance: String,
    pub argument_name: String,
}

/// Blocks planning until meal times are known.
pub fn check(profile: &Profile) -> Option<Clarification> {
    if profile.meal_times.is_some() {
        return None;
    }
    Some(Clarification {
        step: 0,
        user_guidance: MEAL_TIMES_GUIDANCE.to_string(),
        argument_name: "meal_times".to_string(),
    })
}
