//! Onboarding steps — the closed, ordered set of screens in the flow.

use serde::{Deserialize, Serialize};

use super::model::AnswerField;

/// Number of steps in the onboarding flow.
pub const TOTAL_STEPS: usize = OnboardingStep::ALL.len();

/// The steps of the onboarding flow, in order.
///
/// AgeRange → Gender → Goal → BodyMetrics → FitnessLevel →
/// WorkoutEnvironment → Schedule → PlanGeneration → PlanReady.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    AgeRange,
    Gender,
    Goal,
    BodyMetrics,
    FitnessLevel,
    WorkoutEnvironment,
    /// Session length and weekly frequency preferences.
    Schedule,
    /// Transition screen while the personalized plan is built.
    PlanGeneration,
    PlanReady,
}

impl OnboardingStep {
    /// Every step, indexed by position.
    pub const ALL: [OnboardingStep; 9] = [
        Self::AgeRange,
        Self::Gender,
        Self::Goal,
        Self::BodyMetrics,
        Self::FitnessLevel,
        Self::WorkoutEnvironment,
        Self::Schedule,
        Self::PlanGeneration,
        Self::PlanReady,
    ];

    /// Position of this step in the flow.
    pub fn index(self) -> usize {
        match self {
            Self::AgeRange => 0,
            Self::Gender => 1,
            Self::Goal => 2,
            Self::BodyMetrics => 3,
            Self::FitnessLevel => 4,
            Self::WorkoutEnvironment => 5,
            Self::Schedule => 6,
            Self::PlanGeneration => 7,
            Self::PlanReady => 8,
        }
    }

    /// Look up a step by position.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn is_first(self) -> bool {
        self.index() == 0
    }

    pub fn is_final(self) -> bool {
        self.index() == TOTAL_STEPS - 1
    }

    /// Whether entering this step invokes the plan generator.
    pub fn is_generation(self) -> bool {
        matches!(self, Self::PlanGeneration)
    }

    /// Answers that must be present before the user can leave this step.
    pub fn required_fields(self) -> &'static [AnswerField] {
        match self {
            Self::AgeRange => &[AnswerField::AgeRange],
            Self::Gender => &[AnswerField::Gender],
            Self::Goal => &[AnswerField::PrimaryGoal],
            Self::BodyMetrics => &[
                AnswerField::CurrentWeight,
                AnswerField::WeightUnit,
                AnswerField::Height,
                AnswerField::HeightUnit,
            ],
            Self::FitnessLevel => &[AnswerField::FitnessLevel],
            Self::WorkoutEnvironment => &[AnswerField::WorkoutEnvironment],
            Self::Schedule => &[AnswerField::AvailableMinutes, AnswerField::DaysPerWeek],
            Self::PlanGeneration | Self::PlanReady => &[],
        }
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::AgeRange
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AgeRange => "age_range",
            Self::Gender => "gender",
            Self::Goal => "goal",
            Self::BodyMetrics => "body_metrics",
            Self::FitnessLevel => "fitness_level",
            Self::WorkoutEnvironment => "workout_environment",
            Self::Schedule => "schedule",
            Self::PlanGeneration => "plan_generation",
            Self::PlanReady => "plan_ready",
        };
        write!(f, "{s}")
    }
}
