//! In-process store — keeps the snapshot and completed profiles in memory.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::onboarding::{CompletionHandler, OnboardingAnswers, PersistedSnapshot};

use super::traits::PersistenceAdapter;

/// Memory-backed [`PersistenceAdapter`] and [`CompletionHandler`].
///
/// Used when no database path is configured; state is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: RwLock<Option<PersistedSnapshot>>,
    completed: RwLock<Vec<OnboardingAnswers>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a snapshot, as if left by an earlier session.
    pub fn with_snapshot(snapshot: PersistedSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// The currently stored snapshot.
    pub async fn snapshot(&self) -> Option<PersistedSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Every finalized answer set, oldest first.
    pub async fn completed(&self) -> Vec<OnboardingAnswers> {
        self.completed.read().await.clone()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryStore {
    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), DatabaseError> {
        *self.snapshot.write().await = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedSnapshot>, DatabaseError> {
        Ok(self.snapshot().await)
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        *self.snapshot.write().await = None;
        Ok(())
    }
}

#[async_trait]
impl CompletionHandler for MemoryStore {
    async fn on_complete(&self, answers: OnboardingAnswers) -> Result<(), DatabaseError> {
        self.completed.write().await.push(answers);
        Ok(())
    }
}
