//! Plan models returned by generators.

use serde::{Deserialize, Serialize};

/// A single exercise in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub name: String,
    pub sets: u8,
    /// Repetition target, e.g. `"8-12"` or `"45s"`.
    pub reps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u16>,
}

/// A workout plan synthesized from onboarding answers.
///
/// The shape mirrors what the plan service returns; the flow controller
/// stores it without looking inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedPlan {
    pub title: String,
    pub description: String,
    pub workouts_per_week: u8,
    /// Human-readable session length, e.g. `"30 min"`.
    pub duration: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}
