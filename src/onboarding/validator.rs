//! Step validation — pure predicates over the accumulated answers.

use super::model::{AnswerField, OnboardingAnswers};
use super::step::OnboardingStep;

/// Whether `answers` satisfies every required field of `step`.
///
/// Steps without required fields (the generation and final steps) are
/// always valid. Plan readiness is tracked separately by the controller.
pub fn validate(step: OnboardingStep, answers: &OnboardingAnswers) -> bool {
    step.required_fields()
        .iter()
        .all(|field| field.is_satisfied(answers))
}

/// Validate by step position.
///
/// # Panics
///
/// Panics if `index` is not a valid step position. Callers hold positions
/// produced by the flow controller, which never leaves `0..TOTAL_STEPS`.
pub fn validate_index(index: usize, answers: &OnboardingAnswers) -> bool {
    validate(OnboardingStep::ALL[index], answers)
}

/// Required fields of `step` that `answers` does not satisfy yet.
pub fn missing_fields(step: OnboardingStep, answers: &OnboardingAnswers) -> Vec<AnswerField> {
    step.required_fields()
        .iter()
        .copied()
        .filter(|field| !field.is_satisfied(answers))
        .collect()
}
