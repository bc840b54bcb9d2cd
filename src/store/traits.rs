//! `PersistenceAdapter` trait — the storage seam the flow controller depends on.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::onboarding::PersistedSnapshot;

/// Key-value storage for the in-progress onboarding snapshot.
///
/// The flow controller treats every failure here as non-fatal: a failed
/// `load` starts a fresh session and a failed `save` or `clear` is logged.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Store `snapshot`, replacing any previous one.
    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), DatabaseError>;

    /// Load the last stored snapshot, or `None` for a fresh session.
    async fn load(&self) -> Result<Option<PersistedSnapshot>, DatabaseError>;

    /// Remove the stored snapshot. Clearing an empty store is not an error.
    async fn clear(&self) -> Result<(), DatabaseError>;
}
