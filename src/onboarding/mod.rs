//! Onboarding flow — first-launch questionnaire that builds a fitness
//! profile and a personalized plan.
//!
//! The flow is a fixed sequence of steps. Each step owns a few answers and
//! may only be left forwards once those answers validate. Entering the
//! generation step asks a `PlanGenerator` for a plan; the last step hands
//! the finalized answers to a `CompletionHandler`.

pub mod completion;
pub mod controller;
pub mod model;
pub mod routes;
pub mod snapshot;
pub mod step;
pub mod validator;

pub use completion::CompletionHandler;
pub use controller::{FlowController, FlowStatus, Navigation};
pub use model::{AnswerField, AnswersPatch, OnboardingAnswers};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use snapshot::PersistedSnapshot;
pub use step::{OnboardingStep, TOTAL_STEPS};
