//! FlowController — owns the onboarding position and answers and exposes the
//! only mutation surface for both.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::plans::PlanGenerator;
use crate::progress;
use crate::store::autosave::{self, AutoSaveConfig, AutoSaver};
use crate::store::PersistenceAdapter;

use super::model::{AnswerField, AnswersPatch, OnboardingAnswers};
use super::snapshot::PersistedSnapshot;
use super::step::{OnboardingStep, TOTAL_STEPS};
use super::validator;

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Navigation {
    /// The position changed.
    Moved { from: usize, to: usize },
    /// The position did not change. Apart from `reset_flow`, which clears
    /// the answers regardless, nothing else changed either.
    Stayed,
    /// A `next_step` is still pending; nothing changed.
    Busy,
}

impl Navigation {
    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Read-only view of the flow with every derived flag freshly computed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStatus {
    pub session_id: Uuid,
    pub step: OnboardingStep,
    pub position: usize,
    pub total_steps: usize,
    pub is_valid: bool,
    pub can_go_next: bool,
    pub can_go_back: bool,
    pub is_transitioning: bool,
    /// Whether a generated plan is stored. Independent of `is_valid`.
    pub plan_ready: bool,
    pub missing_fields: Vec<AnswerField>,
    pub progress_percent: u8,
    pub started_at: DateTime<Utc>,
    pub answers: OnboardingAnswers,
}

/// Position and answers, always read and written together.
#[derive(Debug, Clone)]
struct FlowState {
    session_id: Uuid,
    /// Invariant: `position < TOTAL_STEPS`.
    position: usize,
    answers: OnboardingAnswers,
    started_at: DateTime<Utc>,
    /// Number of resets applied to this controller.
    epoch: u64,
}

impl FlowState {
    fn fresh() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            position: 0,
            answers: OnboardingAnswers::default(),
            started_at: Utc::now(),
            epoch: 0,
        }
    }

    fn from_snapshot(snapshot: PersistedSnapshot) -> Self {
        Self {
            session_id: snapshot.session_id,
            position: snapshot.position,
            answers: snapshot.answers,
            started_at: snapshot.started_at,
            epoch: 0,
        }
    }

    fn step(&self) -> OnboardingStep {
        OnboardingStep::ALL[self.position]
    }

    fn is_valid(&self) -> bool {
        validator::validate(self.step(), &self.answers)
    }

    fn can_go_next(&self) -> bool {
        self.is_valid() && self.position < TOTAL_STEPS - 1
    }

    fn can_go_back(&self) -> bool {
        self.position > 0
    }

    fn snapshot(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            session_id: self.session_id,
            position: self.position,
            answers: self.answers.clone(),
            started_at: self.started_at,
            saved_at: Utc::now(),
        }
    }
}

/// Clears the transitioning flag when the pending `next_step` ends, however
/// it ends.
struct TransitionGuard<'a>(&'a AtomicBool);

impl<'a> TransitionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coordinates one onboarding session: step sequencing, validation-gated
/// advancement, plan generation and snapshot persistence.
///
/// All methods take `&self`; the controller is meant to be owned by a single
/// UI surface and shared behind an `Arc` only so that handlers can reach it.
pub struct FlowController {
    state: RwLock<FlowState>,
    transitioning: AtomicBool,
    store: Arc<dyn PersistenceAdapter>,
    generator: Arc<dyn PlanGenerator>,
    autosave: Option<AutoSaver>,
    save_config: AutoSaveConfig,
    /// Epoch of the latest reset whose clear has been issued. Explicit saves
    /// hold this lock while writing and skip snapshots from older epochs.
    cleared_epoch: Arc<Mutex<u64>>,
}

impl FlowController {
    /// Start a fresh session at the first step.
    pub fn new(store: Arc<dyn PersistenceAdapter>, generator: Arc<dyn PlanGenerator>) -> Self {
        Self::with_state(store, generator, FlowState::fresh())
    }

    /// Resume the session stored in `store`, or start fresh if there is none.
    ///
    /// A failed load or a snapshot pointing outside the flow is logged and
    /// treated as a fresh session.
    pub async fn resume(
        store: Arc<dyn PersistenceAdapter>,
        generator: Arc<dyn PlanGenerator>,
    ) -> Self {
        let state = match store.load().await {
            Ok(Some(snapshot)) if snapshot.step().is_some() => {
                info!(
                    session_id = %snapshot.session_id,
                    position = snapshot.position,
                    "Resuming onboarding session"
                );
                FlowState::from_snapshot(snapshot)
            }
            Ok(Some(snapshot)) => {
                warn!(
                    session_id = %snapshot.session_id,
                    position = snapshot.position,
                    "Discarding snapshot with out-of-range position"
                );
                FlowState::fresh()
            }
            Ok(None) => FlowState::fresh(),
            Err(e) => {
                warn!(error = %e, "Failed to load onboarding snapshot, starting fresh");
                FlowState::fresh()
            }
        };
        Self::with_state(store, generator, state)
    }

    fn with_state(
        store: Arc<dyn PersistenceAdapter>,
        generator: Arc<dyn PlanGenerator>,
        state: FlowState,
    ) -> Self {
        Self {
            state: RwLock::new(state),
            transitioning: AtomicBool::new(false),
            store,
            generator,
            autosave: None,
            save_config: AutoSaveConfig::default(),
            cleared_epoch: Arc::new(Mutex::new(0)),
        }
    }

    /// Persist a snapshot after every mutation through a debounced writer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_autosave(mut self, config: AutoSaveConfig) -> Self {
        self.autosave = Some(AutoSaver::spawn(Arc::clone(&self.store), config.clone()));
        self.save_config = config;
        self
    }

    /// Flush any pending auto-save and drop the controller.
    pub async fn shutdown(self) {
        if let Some(autosave) = self.autosave {
            autosave.shutdown().await;
        }
    }

    // ── Derived state ───────────────────────────────────────────────

    /// Snapshot of the flow with all derived flags recomputed.
    pub async fn status(&self) -> FlowStatus {
        let state = self.state.read().await;
        let step = state.step();
        FlowStatus {
            session_id: state.session_id,
            step,
            position: state.position,
            total_steps: TOTAL_STEPS,
            is_valid: state.is_valid(),
            can_go_next: state.can_go_next(),
            can_go_back: state.can_go_back(),
            is_transitioning: self.is_transitioning(),
            plan_ready: state.answers.personalized_plan.is_some(),
            missing_fields: validator::missing_fields(step, &state.answers),
            progress_percent: progress::flow_progress_percent(state.position, TOTAL_STEPS),
            started_at: state.started_at,
            answers: state.answers.clone(),
        }
    }

    pub async fn position(&self) -> usize {
        self.state.read().await.position
    }

    pub async fn step(&self) -> OnboardingStep {
        self.state.read().await.step()
    }

    /// A copy of the accumulated answers.
    pub async fn answers(&self) -> OnboardingAnswers {
        self.state.read().await.answers.clone()
    }

    pub async fn session_id(&self) -> Uuid {
        self.state.read().await.session_id
    }

    pub async fn is_valid(&self) -> bool {
        self.state.read().await.is_valid()
    }

    pub async fn can_go_next(&self) -> bool {
        self.state.read().await.can_go_next()
    }

    pub async fn can_go_back(&self) -> bool {
        self.state.read().await.can_go_back()
    }

    /// Whether a `next_step` call is in flight.
    pub fn is_transitioning(&self) -> bool {
        self.transitioning.load(Ordering::Acquire)
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Merge `patch` into the answers. No validation happens here.
    pub async fn update_data(&self, patch: AnswersPatch) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.answers.merge(patch);
            state.snapshot()
        };
        debug!(
            session_id = %snapshot.session_id,
            position = snapshot.position,
            "Answers updated"
        );
        self.schedule_autosave(snapshot);
    }

    /// Advance one step if the current step is valid and not the last.
    ///
    /// Entering the generation step first awaits the plan generator and
    /// stores its plan; a failed generation is logged and the flow advances
    /// without a plan. Calls made while another `next_step` is pending return
    /// [`Navigation::Busy`].
    pub async fn next_step(&self) -> Navigation {
        let Some(_guard) = TransitionGuard::acquire(&self.transitioning) else {
            debug!("next_step ignored, transition already in progress");
            return Navigation::Busy;
        };

        let (session_id, from, generation_input) = {
            let state = self.state.read().await;
            if !state.can_go_next() {
                debug!(
                    session_id = %state.session_id,
                    step = %state.step(),
                    "next_step blocked by validation or last step"
                );
                return Navigation::Stayed;
            }
            let target = OnboardingStep::ALL[state.position + 1];
            let input = target.is_generation().then(|| state.answers.clone());
            (state.session_id, state.position, input)
        };
        let to = from + 1;

        let plan = match generation_input {
            Some(answers) => {
                info!(
                    session_id = %session_id,
                    generator = self.generator.name(),
                    "Generating personalized plan"
                );
                match self.generator.generate(answers).await {
                    Ok(plan) => Some(plan),
                    Err(e) => {
                        warn!(
                            session_id = %session_id,
                            generator = self.generator.name(),
                            error = %e,
                            "Plan generation failed, continuing without a plan"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let snapshot = {
            let mut state = self.state.write().await;
            if OnboardingStep::ALL[to].is_generation() {
                state.answers.personalized_plan = plan;
            }
            state.position = to;
            state.snapshot()
        };

        info!(
            session_id = %session_id,
            from,
            to,
            step = %OnboardingStep::ALL[to],
            "Onboarding advanced"
        );
        self.schedule_autosave(snapshot);
        Navigation::Moved { from, to }
    }

    /// Go back one step. Earlier answers are kept and not re-validated.
    pub async fn previous_step(&self) -> Navigation {
        let mut state = self.state.write().await;
        if self.is_transitioning() {
            return Navigation::Busy;
        }
        if state.position == 0 {
            return Navigation::Stayed;
        }

        let from = state.position;
        state.position -= 1;
        let snapshot = state.snapshot();
        drop(state);

        debug!(session_id = %snapshot.session_id, from, to = from - 1, "Onboarding went back");
        self.schedule_autosave(snapshot);
        Navigation::Moved { from, to: from - 1 }
    }

    /// Move straight to `index` without validation gating, e.g. when a UI
    /// restores a saved position. Out-of-range indices are ignored.
    pub async fn jump_to_step(&self, index: usize) -> Navigation {
        let mut state = self.state.write().await;
        if self.is_transitioning() {
            return Navigation::Busy;
        }
        if index >= TOTAL_STEPS {
            debug!(index, "jump_to_step ignored, index out of range");
            return Navigation::Stayed;
        }
        if index == state.position {
            return Navigation::Stayed;
        }

        let from = state.position;
        state.position = index;
        let snapshot = state.snapshot();
        drop(state);

        info!(session_id = %snapshot.session_id, from, to = index, "Onboarding jumped");
        self.schedule_autosave(snapshot);
        Navigation::Moved { from, to: index }
    }

    /// Clear all answers, return to the first step and drop the stored
    /// snapshot.
    ///
    /// Returns `Stayed` when already on the first step (the answers are
    /// cleared either way) and `Busy` without effect while a transition is
    /// in flight. Explicit saves started before the reset never land after
    /// the clear.
    pub async fn reset_flow(&self) -> Navigation {
        let (session_id, from, epoch) = {
            let mut state = self.state.write().await;
            if self.is_transitioning() {
                return Navigation::Busy;
            }
            let previous = (state.session_id, state.position);
            let epoch = state.epoch + 1;
            *state = FlowState {
                epoch,
                ..FlowState::fresh()
            };
            (previous.0, previous.1, epoch)
        };

        info!(session_id = %session_id, from, "Onboarding reset");
        {
            let mut cleared = self.cleared_epoch.lock().await;
            *cleared = epoch;
            match self.autosave {
                Some(ref autosave) => autosave.clear(),
                None => {
                    if let Err(e) = self.store.clear().await {
                        warn!(session_id = %session_id, error = %e, "Failed to clear stored snapshot");
                    }
                }
            }
        }

        if from == 0 {
            Navigation::Stayed
        } else {
            Navigation::Moved { from, to: 0 }
        }
    }

    /// Write the current snapshot in the background.
    ///
    /// Storage errors are logged and never surfaced. The returned handle
    /// may be awaited or dropped.
    pub async fn save_progress(&self) -> JoinHandle<()> {
        let (snapshot, epoch) = {
            let state = self.state.read().await;
            (state.snapshot(), state.epoch)
        };
        let store = Arc::clone(&self.store);
        let config = self.save_config.clone();
        let cleared_epoch = Arc::clone(&self.cleared_epoch);

        tokio::spawn(async move {
            let cleared = cleared_epoch.lock().await;
            if epoch < *cleared {
                debug!(
                    session_id = %snapshot.session_id,
                    "Dropping save started before a reset"
                );
                return;
            }
            match autosave::with_retry(&config, "save", || store.save(&snapshot)).await {
                Ok(()) => debug!(
                    session_id = %snapshot.session_id,
                    position = snapshot.position,
                    "Progress saved"
                ),
                Err(e) => warn!(
                    session_id = %snapshot.session_id,
                    error = %e,
                    "Failed to save onboarding progress"
                ),
            }
        })
    }

    /// Stamp the answers as complete and return a copy for the completion
    /// callback. Returns `None` unless the flow is on its last step.
    pub async fn finalize(&self) -> Option<OnboardingAnswers> {
        let (answers, snapshot) = {
            let mut state = self.state.write().await;
            if !state.step().is_final() {
                return None;
            }
            if state.answers.completed_at.is_none() {
                state.answers.completed_at = Some(Utc::now());
            }
            (state.answers.clone(), state.snapshot())
        };

        info!(session_id = %snapshot.session_id, "Onboarding finalized");
        self.schedule_autosave(snapshot);
        Some(answers)
    }

    fn schedule_autosave(&self, snapshot: PersistedSnapshot) {
        if let Some(ref autosave) = self.autosave {
            autosave.schedule(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DatabaseError, GenerationError};
    use crate::onboarding::model::{
        AgeRange, FitnessGoal, FitnessLevel, Gender, HeightUnit, WeightUnit, WorkoutEnvironment,
    };
    use crate::plans::{PersonalizedPlan, TemplatePlanGenerator};
    use crate::store::MemoryStore;

    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;

    /// Counts calls and yields before answering so concurrent callers overlap.
    struct CountingGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingGenerator {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PlanGenerator for CountingGenerator {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(
            &self,
            answers: OnboardingAnswers,
        ) -> Result<PersonalizedPlan, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(GenerationError::RequestFailed {
                    generator: "counting".to_string(),
                    reason: "service down".to_string(),
                });
            }
            TemplatePlanGenerator::new().build(&answers)
        }
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl PersistenceAdapter for BrokenStore {
        async fn save(&self, _snapshot: &PersistedSnapshot) -> Result<(), DatabaseError> {
            Err(DatabaseError::Unavailable("quota exceeded".to_string()))
        }

        async fn load(&self) -> Result<Option<PersistedSnapshot>, DatabaseError> {
            Err(DatabaseError::Unavailable("quota exceeded".to_string()))
        }

        async fn clear(&self) -> Result<(), DatabaseError> {
            Err(DatabaseError::Unavailable("quota exceeded".to_string()))
        }
    }

    fn controller() -> (FlowController, Arc<MemoryStore>, Arc<CountingGenerator>) {
        let store = Arc::new(MemoryStore::new());
        let generator = CountingGenerator::new(false);
        let flow = FlowController::new(store.clone(), generator.clone());
        (flow, store, generator)
    }

    /// Answers satisfying every step before generation.
    fn complete_patch() -> AnswersPatch {
        AnswersPatch {
            age_range: Some(AgeRange::From30To39),
            gender: Some(Gender::Female),
            primary_goal: Some(FitnessGoal::BuildMuscle),
            current_weight: Some(68.0),
            weight_unit: Some(WeightUnit::Kg),
            height: Some(170.0),
            height_unit: Some(HeightUnit::Cm),
            fitness_level: Some(FitnessLevel::Beginner),
            workout_environment: Some(WorkoutEnvironment::Home),
            available_minutes: Some(30),
            days_per_week: Some(3),
            ..Default::default()
        }
    }

    /// Fill every answer and walk to the schedule step.
    async fn walk_to_schedule(flow: &FlowController) {
        flow.update_data(complete_patch()).await;
        while flow.step().await != OnboardingStep::Schedule {
            assert!(flow.next_step().await.moved());
        }
    }

    #[tokio::test]
    async fn fresh_flow_starts_at_first_step() {
        let (flow, _, _) = controller();
        let status = flow.status().await;

        assert_eq!(status.position, 0);
        assert_eq!(status.step, OnboardingStep::AgeRange);
        assert_eq!(status.total_steps, 9);
        assert!(!status.is_valid);
        assert!(!status.can_go_next);
        assert!(!status.can_go_back);
        assert!(!status.plan_ready);
        assert_eq!(status.missing_fields, vec![AnswerField::AgeRange]);
        assert!(status.answers.is_empty());
    }

    #[tokio::test]
    async fn next_step_is_gated_by_validation() {
        let (flow, _, _) = controller();

        for _ in 0..3 {
            assert_eq!(flow.next_step().await, Navigation::Stayed);
        }
        assert_eq!(flow.position().await, 0);
    }

    #[tokio::test]
    async fn previous_step_at_first_step_stays() {
        let (flow, _, _) = controller();
        assert_eq!(flow.previous_step().await, Navigation::Stayed);
        assert_eq!(flow.previous_step().await, Navigation::Stayed);
        assert_eq!(flow.position().await, 0);
    }

    #[tokio::test]
    async fn update_data_accumulates() {
        let (flow, _, _) = controller();
        flow.update_data(AnswersPatch {
            age_range: Some(AgeRange::From18To29),
            ..Default::default()
        })
        .await;
        flow.update_data(AnswersPatch {
            gender: Some(Gender::Female),
            ..Default::default()
        })
        .await;

        let answers = flow.answers().await;
        assert_eq!(answers.age_range, Some(AgeRange::From18To29));
        assert_eq!(answers.gender, Some(Gender::Female));
    }

    #[tokio::test]
    async fn back_navigation_keeps_answers() {
        let (flow, _, _) = controller();
        flow.update_data(AnswersPatch {
            age_range: Some(AgeRange::From30To39),
            ..Default::default()
        })
        .await;

        assert_eq!(flow.next_step().await, Navigation::Moved { from: 0, to: 1 });
        assert!(flow.can_go_back().await);

        assert_eq!(flow.previous_step().await, Navigation::Moved { from: 1, to: 0 });
        assert_eq!(flow.position().await, 0);
        assert_eq!(flow.answers().await.age_range, Some(AgeRange::From30To39));
        assert!(!flow.can_go_back().await);
    }

    #[tokio::test]
    async fn derived_flags_follow_every_mutation() {
        let (flow, _, _) = controller();
        assert!(!flow.is_valid().await);

        flow.update_data(AnswersPatch {
            age_range: Some(AgeRange::SixtyPlus),
            ..Default::default()
        })
        .await;
        assert!(flow.is_valid().await);
        assert!(flow.can_go_next().await);

        flow.next_step().await;
        // Gender step has no answer yet
        assert!(!flow.is_valid().await);
        assert!(!flow.can_go_next().await);
    }

    #[tokio::test]
    async fn entering_generation_step_stores_plan() {
        let (flow, _, generator) = controller();
        walk_to_schedule(&flow).await;
        assert_eq!(generator.calls(), 0);

        assert_eq!(flow.next_step().await, Navigation::Moved { from: 6, to: 7 });
        assert_eq!(generator.calls(), 1);

        let status = flow.status().await;
        assert_eq!(status.step, OnboardingStep::PlanGeneration);
        assert!(status.plan_ready);
        assert!(status.is_valid);
        assert_eq!(
            status.answers.personalized_plan.unwrap().title,
            "Beginner Strength Builder"
        );

        // Leaving the generation step does not generate again
        assert_eq!(flow.next_step().await, Navigation::Moved { from: 7, to: 8 });
        assert_eq!(generator.calls(), 1);
        assert!(!flow.can_go_next().await);
        assert_eq!(flow.next_step().await, Navigation::Stayed);
    }

    #[tokio::test]
    async fn concurrent_next_step_generates_once_and_advances_once() {
        let (flow, _, generator) = controller();
        walk_to_schedule(&flow).await;

        let (first, second) = tokio::join!(flow.next_step(), flow.next_step());

        assert_eq!(first, Navigation::Moved { from: 6, to: 7 });
        assert_eq!(second, Navigation::Busy);
        assert_eq!(generator.calls(), 1);
        assert_eq!(flow.position().await, 7);
        assert!(!flow.is_transitioning());
    }

    #[tokio::test]
    async fn navigation_is_rejected_while_generating() {
        let (flow, _, _) = controller();
        walk_to_schedule(&flow).await;

        let (advance, back, jump, reset) = tokio::join!(
            flow.next_step(),
            async {
                tokio::task::yield_now().await;
                flow.previous_step().await
            },
            async {
                tokio::task::yield_now().await;
                flow.jump_to_step(0).await
            },
            async {
                tokio::task::yield_now().await;
                flow.reset_flow().await
            },
        );

        assert!(advance.moved());
        assert_eq!(back, Navigation::Busy);
        assert_eq!(jump, Navigation::Busy);
        assert_eq!(reset, Navigation::Busy);
        assert_eq!(flow.position().await, 7);
    }

    #[tokio::test]
    async fn failed_generation_still_advances() {
        let store = Arc::new(MemoryStore::new());
        let generator = CountingGenerator::new(true);
        let flow = FlowController::new(store, generator.clone());
        walk_to_schedule(&flow).await;

        assert_eq!(flow.next_step().await, Navigation::Moved { from: 6, to: 7 });
        assert_eq!(generator.calls(), 1);

        let status = flow.status().await;
        assert!(!status.plan_ready);
        assert!(status.answers.personalized_plan.is_none());
        assert!(status.can_go_next);
        assert!(!flow.is_transitioning());
    }

    #[tokio::test]
    async fn jump_is_bounds_checked_and_ungated() {
        let (flow, _, _) = controller();

        assert_eq!(flow.jump_to_step(9).await, Navigation::Stayed);
        assert_eq!(flow.jump_to_step(usize::MAX).await, Navigation::Stayed);
        assert_eq!(flow.position().await, 0);

        // No answers, but jumping is not gated
        assert_eq!(flow.jump_to_step(5).await, Navigation::Moved { from: 0, to: 5 });
        assert_eq!(flow.step().await, OnboardingStep::WorkoutEnvironment);
    }

    #[tokio::test]
    async fn jump_to_current_position_is_a_no_op() {
        let (flow, store, _) = controller();
        flow.update_data(AnswersPatch {
            gender: Some(Gender::Male),
            ..Default::default()
        })
        .await;
        let before = flow.answers().await;

        assert_eq!(flow.jump_to_step(0).await, Navigation::Stayed);
        assert_eq!(flow.answers().await, before);
        assert_eq!(flow.position().await, 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn reset_clears_answers_position_and_snapshot() {
        let (flow, store, _) = controller();
        let old_session = flow.session_id().await;
        walk_to_schedule(&flow).await;
        flow.save_progress().await.await.unwrap();
        assert!(store.snapshot().await.is_some());

        assert_eq!(flow.reset_flow().await, Navigation::Moved { from: 6, to: 0 });

        let status = flow.status().await;
        assert_eq!(status.position, 0);
        assert!(status.answers.is_empty());
        assert_ne!(status.session_id, old_session);
        assert!(store.snapshot().await.is_none());
    }

    /// Delays every save so a write can still be running when reset happens.
    struct SlowStore {
        delay: Duration,
        inner: MemoryStore,
    }

    #[async_trait]
    impl PersistenceAdapter for SlowStore {
        async fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), DatabaseError> {
            tokio::time::sleep(self.delay).await;
            self.inner.save(snapshot).await
        }

        async fn load(&self) -> Result<Option<PersistedSnapshot>, DatabaseError> {
            self.inner.load().await
        }

        async fn clear(&self) -> Result<(), DatabaseError> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn save_queued_before_reset_does_not_restore_old_session() {
        let (flow, store, generator) = controller();
        let old_session = flow.session_id().await;
        flow.update_data(AnswersPatch {
            age_range: Some(AgeRange::From30To39),
            ..Default::default()
        })
        .await;

        let pending = flow.save_progress().await;
        assert_eq!(flow.reset_flow().await, Navigation::Stayed);
        pending.await.unwrap();

        assert!(store.snapshot().await.is_none());
        let resumed = FlowController::resume(store, generator).await;
        assert_ne!(resumed.session_id().await, old_session);
        assert!(resumed.answers().await.is_empty());
    }

    #[tokio::test]
    async fn save_in_flight_during_reset_lands_before_the_clear() {
        let store = Arc::new(SlowStore {
            delay: Duration::from_millis(30),
            inner: MemoryStore::new(),
        });
        let flow = FlowController::new(store.clone(), CountingGenerator::new(false));
        flow.update_data(complete_patch()).await;
        flow.next_step().await;

        let pending = flow.save_progress().await;
        // Let the spawned write start and block inside the store
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(flow.reset_flow().await, Navigation::Moved { from: 1, to: 0 });
        pending.await.unwrap();

        assert!(store.inner.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn saves_after_reset_are_kept() {
        let (flow, store, _) = controller();
        flow.update_data(complete_patch()).await;
        flow.next_step().await;
        flow.reset_flow().await;

        flow.update_data(AnswersPatch {
            gender: Some(Gender::NonBinary),
            ..Default::default()
        })
        .await;
        flow.save_progress().await.await.unwrap();

        let saved = store.snapshot().await.unwrap();
        assert_eq!(saved.session_id, flow.session_id().await);
        assert_eq!(saved.answers.gender, Some(Gender::NonBinary));
        assert!(saved.answers.age_range.is_none());
    }

    #[tokio::test]
    async fn reset_on_first_step_stays_and_clears_answers() {
        let (flow, _, _) = controller();
        flow.update_data(AnswersPatch {
            age_range: Some(AgeRange::From18To29),
            ..Default::default()
        })
        .await;

        assert_eq!(flow.reset_flow().await, Navigation::Stayed);
        assert!(flow.answers().await.is_empty());
    }

    #[tokio::test]
    async fn save_progress_writes_consistent_snapshot() {
        let (flow, store, _) = controller();
        flow.update_data(AnswersPatch {
            age_range: Some(AgeRange::From50To59),
            ..Default::default()
        })
        .await;
        flow.next_step().await;

        flow.save_progress().await.await.unwrap();

        let saved = store.snapshot().await.unwrap();
        assert_eq!(saved.position, 1);
        assert_eq!(saved.answers.age_range, Some(AgeRange::From50To59));
        assert_eq!(saved.session_id, flow.session_id().await);
    }

    #[tokio::test]
    async fn failing_store_never_blocks_the_flow() {
        let flow = FlowController::new(Arc::new(BrokenStore), CountingGenerator::new(false))
            .with_autosave(AutoSaveConfig {
                debounce: Duration::from_millis(5),
                ..Default::default()
            });
        flow.update_data(AnswersPatch {
            age_range: Some(AgeRange::From18To29),
            ..Default::default()
        })
        .await;

        // The background task finishes without panicking
        flow.save_progress().await.await.unwrap();
        assert_eq!(flow.next_step().await, Navigation::Moved { from: 0, to: 1 });
        assert_eq!(flow.reset_flow().await, Navigation::Moved { from: 1, to: 0 });
        flow.shutdown().await;
    }

    #[tokio::test]
    async fn resume_restores_saved_session() {
        let (flow, store, generator) = controller();
        walk_to_schedule(&flow).await;
        flow.save_progress().await.await.unwrap();
        let session_id = flow.session_id().await;

        let resumed = FlowController::resume(store, generator).await;
        let status = resumed.status().await;
        assert_eq!(status.session_id, session_id);
        assert_eq!(status.step, OnboardingStep::Schedule);
        assert_eq!(status.answers.days_per_week, Some(3));
    }

    #[tokio::test]
    async fn resume_tolerates_missing_broken_and_invalid_snapshots() {
        let generator = CountingGenerator::new(false);

        let empty = FlowController::resume(Arc::new(MemoryStore::new()), generator.clone()).await;
        assert_eq!(empty.position().await, 0);

        let broken = FlowController::resume(Arc::new(BrokenStore), generator.clone()).await;
        assert_eq!(broken.position().await, 0);

        let invalid = PersistedSnapshot {
            session_id: Uuid::new_v4(),
            position: TOTAL_STEPS,
            answers: OnboardingAnswers::default(),
            started_at: Utc::now(),
            saved_at: Utc::now(),
        };
        let store = Arc::new(MemoryStore::with_snapshot(invalid));
        let out_of_range = FlowController::resume(store, generator).await;
        assert_eq!(out_of_range.position().await, 0);
    }

    #[tokio::test]
    async fn autosave_persists_latest_state() {
        let store = Arc::new(MemoryStore::new());
        let flow = FlowController::new(store.clone(), CountingGenerator::new(false))
            .with_autosave(AutoSaveConfig {
                debounce: Duration::from_millis(10),
                ..Default::default()
            });

        flow.update_data(AnswersPatch {
            age_range: Some(AgeRange::From40To49),
            ..Default::default()
        })
        .await;
        flow.next_step().await;
        flow.shutdown().await;

        let saved = store.snapshot().await.unwrap();
        assert_eq!(saved.position, 1);
        assert_eq!(saved.answers.age_range, Some(AgeRange::From40To49));
    }

    #[tokio::test]
    async fn finalize_only_on_last_step() {
        let (flow, _, _) = controller();
        assert!(flow.finalize().await.is_none());

        walk_to_schedule(&flow).await;
        flow.next_step().await;
        flow.next_step().await;
        assert!(flow.step().await.is_final());

        let answers = flow.finalize().await.unwrap();
        let completed_at = answers.completed_at.unwrap();
        assert!(answers.personalized_plan.is_some());

        // Finalizing again keeps the first timestamp
        let again = flow.finalize().await.unwrap();
        assert_eq!(again.completed_at, Some(completed_at));
    }

    #[tokio::test]
    async fn regenerating_replaces_previous_plan() {
        let (flow, _, generator) = controller();
        walk_to_schedule(&flow).await;
        flow.next_step().await;
        let first = flow.answers().await.personalized_plan.unwrap();

        flow.previous_step().await;
        flow.update_data(AnswersPatch {
            primary_goal: Some(FitnessGoal::IncreaseFlexibility),
            ..Default::default()
        })
        .await;
        flow.next_step().await;

        let second = flow.answers().await.personalized_plan.unwrap();
        assert_eq!(generator.calls(), 2);
        assert_ne!(first.title, second.title);
        assert_eq!(second.title, "Beginner Mobility Flow");
    }
}
