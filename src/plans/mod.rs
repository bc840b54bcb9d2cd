//! Personalized plan generation.
//!
//! The flow controller hands the accumulated answers to a [`PlanGenerator`]
//! when the generation step is entered. Two generators ship with the crate:
//! a local, deterministic [`TemplatePlanGenerator`] and an
//! [`HttpPlanGenerator`] that delegates to a remote plan service.

pub mod http;
pub mod model;
pub mod template;

pub use http::{HttpGeneratorConfig, HttpPlanGenerator};
pub use model::{Exercise, PersonalizedPlan};
pub use template::TemplatePlanGenerator;

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::onboarding::OnboardingAnswers;

/// Builds a personalized plan from finished onboarding answers.
///
/// Latency is unbounded; callers must not assume the call returns quickly.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a plan from a copy of the answers.
    async fn generate(&self, answers: OnboardingAnswers)
    -> Result<PersonalizedPlan, GenerationError>;
}
