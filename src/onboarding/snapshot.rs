//! Persisted snapshot of an in-progress onboarding session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::OnboardingAnswers;
use super::step::OnboardingStep;

/// A copy of (position, answers, start time) taken in one read of the
/// controller state, so a write never pairs a position with answers from a
/// different moment.
///
/// Stored as JSON under the `"onboarding_snapshot"` settings key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub session_id: Uuid,
    pub position: usize,
    pub answers: OnboardingAnswers,
    pub started_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl PersistedSnapshot {
    /// The step the snapshot was taken on, if its position is in range.
    pub fn step(&self) -> Option<OnboardingStep> {
        OnboardingStep::from_index(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::Gender;

    #[test]
    fn snapshot_serde_roundtrip() {
        let snapshot = PersistedSnapshot {
            session_id: Uuid::new_v4(),
            position: 3,
            answers: OnboardingAnswers {
                gender: Some(Gender::NonBinary),
                ..Default::default()
            },
            started_at: Utc::now(),
            saved_at: Utc::now(),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["position"], 3);
        assert_eq!(json["answers"]["gender"], "non_binary");

        let parsed: PersistedSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, snapshot);
        assert_eq!(parsed.step(), Some(OnboardingStep::BodyMetrics));
    }

    #[test]
    fn out_of_range_position_has_no_step() {
        let snapshot = PersistedSnapshot {
            session_id: Uuid::new_v4(),
            position: 42,
            answers: OnboardingAnswers::default(),
            started_at: Utc::now(),
            saved_at: Utc::now(),
        };
        assert_eq!(snapshot.step(), None);
    }
}
