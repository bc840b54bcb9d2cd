//! Onboarding answer models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plans::PersonalizedPlan;

/// Age bracket picked on the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeRange {
    #[serde(rename = "18-29")]
    From18To29,
    #[serde(rename = "30-39")]
    From30To39,
    #[serde(rename = "40-49")]
    From40To49,
    #[serde(rename = "50-59")]
    From50To59,
    #[serde(rename = "60+")]
    SixtyPlus,
}

impl std::fmt::Display for AgeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::From18To29 => "18-29",
            Self::From30To39 => "30-39",
            Self::From40To49 => "40-49",
            Self::From50To59 => "50-59",
            Self::SixtyPlus => "60+",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    PreferNotToSay,
}

/// The user's primary reason for training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    LoseWeight,
    BuildMuscle,
    ImproveEndurance,
    IncreaseFlexibility,
    StayActive,
}

impl std::fmt::Display for FitnessGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LoseWeight => "lose_weight",
            Self::BuildMuscle => "build_muscle",
            Self::ImproveEndurance => "improve_endurance",
            Self::IncreaseFlexibility => "increase_flexibility",
            Self::StayActive => "stay_active",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl std::fmt::Display for FitnessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// Where the user expects to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutEnvironment {
    Home,
    Gym,
    Outdoors,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    Kg,
    Lb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightUnit {
    Cm,
    In,
}

/// Answers accumulated across the onboarding steps.
///
/// Every field stays `None` until the step that owns it is answered. Fields
/// are only ever overwritten by a later [`AnswersPatch`], never cleared, so
/// navigating back and forth keeps earlier answers intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingAnswers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<AgeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_goal: Option<FitnessGoal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_unit: Option<WeightUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_unit: Option<HeightUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness_level: Option<FitnessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_environment: Option<WorkoutEnvironment>,
    /// Minutes available per workout session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_minutes: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_per_week: Option<u8>,
    /// Set by the flow controller when the generation step is entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalized_plan: Option<PersonalizedPlan>,
    /// Set when the flow is finalized on its last step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnboardingAnswers {
    /// Shallow-merge a patch: keys present in `patch` overwrite, every other
    /// key keeps its current value.
    pub fn merge(&mut self, patch: AnswersPatch) {
        let AnswersPatch {
            age_range,
            gender,
            primary_goal,
            current_weight,
            target_weight,
            weight_unit,
            height,
            height_unit,
            fitness_level,
            workout_environment,
            available_minutes,
            days_per_week,
        } = patch;

        overwrite(&mut self.age_range, age_range);
        overwrite(&mut self.gender, gender);
        overwrite(&mut self.primary_goal, primary_goal);
        overwrite(&mut self.current_weight, current_weight);
        overwrite(&mut self.target_weight, target_weight);
        overwrite(&mut self.weight_unit, weight_unit);
        overwrite(&mut self.height, height);
        overwrite(&mut self.height_unit, height_unit);
        overwrite(&mut self.fitness_level, fitness_level);
        overwrite(&mut self.workout_environment, workout_environment);
        overwrite(&mut self.available_minutes, available_minutes);
        overwrite(&mut self.days_per_week, days_per_week);
    }

    /// Whether nothing has been answered yet.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// A partial update issued by whichever step is active.
///
/// The generated plan and the completion timestamp are owned by the flow
/// controller and cannot be set through a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnswersPatch {
    #[serde(default)]
    pub age_range: Option<AgeRange>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub primary_goal: Option<FitnessGoal>,
    #[serde(default)]
    pub current_weight: Option<f64>,
    #[serde(default)]
    pub target_weight: Option<f64>,
    #[serde(default)]
    pub weight_unit: Option<WeightUnit>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub height_unit: Option<HeightUnit>,
    #[serde(default)]
    pub fitness_level: Option<FitnessLevel>,
    #[serde(default)]
    pub workout_environment: Option<WorkoutEnvironment>,
    #[serde(default)]
    pub available_minutes: Option<u16>,
    #[serde(default)]
    pub days_per_week: Option<u8>,
}

/// An answer a step can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnswerField {
    AgeRange,
    Gender,
    PrimaryGoal,
    CurrentWeight,
    WeightUnit,
    Height,
    HeightUnit,
    FitnessLevel,
    WorkoutEnvironment,
    AvailableMinutes,
    DaysPerWeek,
}

impl AnswerField {
    /// Whether `answers` holds a usable value for this field.
    pub fn is_satisfied(self, answers: &OnboardingAnswers) -> bool {
        match self {
            Self::AgeRange => answers.age_range.is_some(),
            Self::Gender => answers.gender.is_some(),
            Self::PrimaryGoal => answers.primary_goal.is_some(),
            Self::CurrentWeight => answers.current_weight.is_some_and(is_positive),
            Self::WeightUnit => answers.weight_unit.is_some(),
            Self::Height => answers.height.is_some_and(is_positive),
            Self::HeightUnit => answers.height_unit.is_some(),
            Self::FitnessLevel => answers.fitness_level.is_some(),
            Self::WorkoutEnvironment => answers.workout_environment.is_some(),
            Self::AvailableMinutes => answers.available_minutes.is_some_and(|m| m > 0),
            Self::DaysPerWeek => answers.days_per_week.is_some_and(|d| (1..=7).contains(&d)),
        }
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl std::fmt::Display for AnswerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AgeRange => "ageRange",
            Self::Gender => "gender",
            Self::PrimaryGoal => "primaryGoal",
            Self::CurrentWeight => "currentWeight",
            Self::WeightUnit => "weightUnit",
            Self::Height => "height",
            Self::HeightUnit => "heightUnit",
            Self::FitnessLevel => "fitnessLevel",
            Self::WorkoutEnvironment => "workoutEnvironment",
            Self::AvailableMinutes => "availableMinutes",
            Self::DaysPerWeek => "daysPerWeek",
        };
        write!(f, "{s}")
    }
}
