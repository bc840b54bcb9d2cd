//! Completion callback contract.

use async_trait::async_trait;

use crate::error::DatabaseError;

use super::model::OnboardingAnswers;

/// Receives the finalized answers once the flow reaches its last step.
///
/// The flow controller never invokes this itself; the owner of the flow calls
/// it with the copy returned by `FlowController::finalize`.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    async fn on_complete(&self, answers: OnboardingAnswers) -> Result<(), DatabaseError>;
}
