//! Debounced auto-save — coalesces snapshot writes off the navigation path.
//!
//! Mutations hand the writer their latest snapshot and return immediately.
//! A background task waits until no change has arrived for the debounce
//! window, then writes only the most recent pending value, so a burst of
//! answers costs one write.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DatabaseError;
use crate::onboarding::PersistedSnapshot;

use super::traits::PersistenceAdapter;

/// Auto-save tuning.
#[derive(Debug, Clone)]
pub struct AutoSaveConfig {
    /// Quiet period after the latest change before the write happens. Each
    /// new change restarts it.
    pub debounce: Duration,
    /// Extra attempts after a failed write. Zero means log and drop.
    pub max_retries: u32,
    /// Delay between attempts.
    pub retry_backoff: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            max_retries: 0,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

/// The latest write waiting for the debounce window.
#[derive(Debug, Clone)]
enum PendingWrite {
    Save(PersistedSnapshot),
    Clear,
}

/// Handle to the background writer task.
///
/// Dropping the handle lets the task flush its last pending write and exit.
pub struct AutoSaver {
    tx: watch::Sender<Option<PendingWrite>>,
    handle: JoinHandle<()>,
}

impl AutoSaver {
    /// Spawn the writer on the current tokio runtime.
    pub fn spawn(store: Arc<dyn PersistenceAdapter>, config: AutoSaveConfig) -> Self {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(run_writer(store, config, rx));
        Self { tx, handle }
    }

    /// Queue `snapshot`, replacing any write still waiting.
    pub fn schedule(&self, snapshot: PersistedSnapshot) {
        self.tx.send_replace(Some(PendingWrite::Save(snapshot)));
    }

    /// Queue removal of the stored snapshot, replacing any write still waiting.
    pub fn clear(&self) {
        self.tx.send_replace(Some(PendingWrite::Clear));
    }

    /// Stop accepting writes and wait for the last pending one to finish.
    pub async fn shutdown(self) {
        let Self { tx, handle } = self;
        drop(tx);
        if let Err(e) = handle.await {
            warn!(error = %e, "Auto-save writer task failed");
        }
    }
}

async fn run_writer(
    store: Arc<dyn PersistenceAdapter>,
    config: AutoSaveConfig,
    mut rx: watch::Receiver<Option<PendingWrite>>,
) {
    while rx.changed().await.is_ok() {
        wait_for_quiet(&mut rx, config.debounce).await;
        let pending = rx.borrow_and_update().clone();

        match pending {
            Some(PendingWrite::Save(snapshot)) => {
                let result = with_retry(&config, "save", || store.save(&snapshot)).await;
                if let Err(e) = result {
                    warn!(
                        session_id = %snapshot.session_id,
                        position = snapshot.position,
                        error = %e,
                        "Auto-save failed, snapshot dropped"
                    );
                }
            }
            Some(PendingWrite::Clear) => {
                if let Err(e) = with_retry(&config, "clear", || store.clear()).await {
                    warn!(error = %e, "Failed to clear stored snapshot");
                }
            }
            None => {}
        }
    }
    debug!("Auto-save writer stopped");
}

/// Return once `quiet` passes with no further change. Every change restarts
/// the timer; a closed channel returns at once so the last write is flushed.
async fn wait_for_quiet(rx: &mut watch::Receiver<Option<PendingWrite>>, quiet: Duration) {
    if quiet.is_zero() {
        return;
    }
    loop {
        tokio::select! {
            _ = tokio::time::sleep(quiet) => return,
            changed = rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

/// Run `op`, retrying up to `config.max_retries` extra times.
pub(crate) async fn with_retry<F, Fut>(
    config: &AutoSaveConfig,
    operation: &str,
    mut op: F,
) -> Result<(), DatabaseError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), DatabaseError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                debug!(operation, attempt, error = %e, "Storage write failed, retrying");
                tokio::time::sleep(config.retry_backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
