//! libSQL backend — durable snapshot and profile storage.
//!
//! Values live in a `settings` table keyed by `(user_id, key)` as JSON text.
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::onboarding::{CompletionHandler, OnboardingAnswers, PersistedSnapshot};
use crate::store::migrations;
use crate::store::traits::PersistenceAdapter;

/// Settings keys used for onboarding persistence.
pub mod settings_keys {
    /// Key for the in-progress PersistedSnapshot JSON blob.
    pub const ONBOARDING_SNAPSHOT: &str = "onboarding_snapshot";
    /// Key for the finalized answers of the most recent completed flow.
    pub const FITNESS_PROFILE: &str = "fitness_profile";
    /// Default user ID (single-user deployments).
    pub const DEFAULT_USER: &str = "default";
}

/// libSQL store scoped to a single user.
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    user_id: String,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path, user_id: impl Into<String>) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db, user_id.into()).await?;
        info!(path = %path.display(), user_id = %store.user_id, "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory(user_id: impl Into<String>) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db, user_id.into()).await
    }

    async fn from_database(db: LibSqlDatabase, user_id: String) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            user_id,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The answers stored by the most recent completed flow.
    pub async fn load_profile(&self) -> Result<Option<OnboardingAnswers>, DatabaseError> {
        match self.get_setting(settings_keys::FITNESS_PROFILE).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| DatabaseError::Serialization(format!("fitness_profile: {e}"))),
            None => Ok(None),
        }
    }

    /// Number of completed flows recorded for this user.
    pub async fn completed_count(&self) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM completed_onboardings WHERE user_id = ?1",
                params![self.user_id.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("completed_count: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0)),
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("completed_count: {e}"))),
        }
    }

    // ── Settings ────────────────────────────────────────────────────

    async fn get_setting(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![self.user_id.as_str(), key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(&self, key: &str, value: String) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
                params![self.user_id.as_str(), key, value, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;
        Ok(())
    }

    async fn delete_setting(&self, key: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM settings WHERE user_id = ?1 AND key = ?2",
                params![self.user_id.as_str(), key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(count > 0)
    }
}

#[async_trait]
impl PersistenceAdapter for LibSqlStore {
    async fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), DatabaseError> {
        let value = serde_json::to_string(snapshot)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.set_setting(settings_keys::ONBOARDING_SNAPSHOT, value)
            .await?;
        debug!(
            session_id = %snapshot.session_id,
            position = snapshot.position,
            "Snapshot saved"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedSnapshot>, DatabaseError> {
        match self.get_setting(settings_keys::ONBOARDING_SNAPSHOT).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| DatabaseError::Serialization(format!("onboarding_snapshot: {e}"))),
            None => Ok(None),
        }
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        let removed = self
            .delete_setting(settings_keys::ONBOARDING_SNAPSHOT)
            .await?;
        debug!(removed, "Snapshot cleared");
        Ok(())
    }
}

#[async_trait]
impl CompletionHandler for LibSqlStore {
    async fn on_complete(&self, answers: OnboardingAnswers) -> Result<(), DatabaseError> {
        let value = serde_json::to_string(&answers)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let completed_at = answers.completed_at.unwrap_or_else(Utc::now).to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO completed_onboardings (user_id, answers, completed_at)
                 VALUES (?1, ?2, ?3)",
                params![self.user_id.as_str(), value.clone(), completed_at],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("on_complete: {e}")))?;
        self.set_setting(settings_keys::FITNESS_PROFILE, value).await?;

        info!(user_id = %self.user_id, "Onboarding profile stored");
        Ok(())
    }
}
