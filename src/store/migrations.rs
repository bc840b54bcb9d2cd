//! Schema versioning for the libSQL store.
//!
//! Applied versions are recorded in `schema_versions`. Each pending step runs
//! in its own transaction together with its version row, so a failed step
//! leaves the database at the previous version.

use libsql::{Connection, params};
use tracing::{debug, info};

use crate::error::DatabaseError;

struct SchemaStep {
    version: i64,
    label: &'static str,
    ddl: &'static str,
}

/// Ordered schema history. Append only.
const SCHEMA: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        label: "settings",
        ddl: "CREATE TABLE IF NOT EXISTS settings (
                  user_id    TEXT NOT NULL,
                  key        TEXT NOT NULL,
                  value      TEXT NOT NULL,
                  updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                  PRIMARY KEY (user_id, key)
              );",
    },
    SchemaStep {
        version: 2,
        label: "completed_onboardings",
        ddl: "CREATE TABLE IF NOT EXISTS completed_onboardings (
                  id           INTEGER PRIMARY KEY AUTOINCREMENT,
                  user_id      TEXT NOT NULL,
                  answers      TEXT NOT NULL,
                  completed_at TEXT NOT NULL
              );
              CREATE INDEX IF NOT EXISTS idx_completed_onboardings_user
                  ON completed_onboardings(user_id);",
    },
];

/// Newest schema version this build knows about.
pub fn latest_version() -> i64 {
    SCHEMA.last().map_or(0, |step| step.version)
}

/// Bring the schema up to [`latest_version`].
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_versions (
             version    INTEGER PRIMARY KEY,
             label      TEXT NOT NULL,
             applied_at TEXT NOT NULL DEFAULT (datetime('now'))
         )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("schema_versions: {e}")))?;

    let applied = current_version(conn).await?;
    for step in SCHEMA.iter().filter(|step| step.version > applied) {
        apply(conn, step).await?;
    }

    debug!(version = latest_version(), "Schema up to date");
    Ok(())
}

async fn apply(conn: &Connection, step: &SchemaStep) -> Result<(), DatabaseError> {
    let fail = |what: &str, e: libsql::Error| {
        DatabaseError::Migration(format!("V{} {} {what}: {e}", step.version, step.label))
    };

    info!(version = step.version, label = step.label, "Applying schema step");
    let tx = conn.transaction().await.map_err(|e| fail("begin", e))?;
    tx.execute_batch(step.ddl).await.map_err(|e| fail("ddl", e))?;
    tx.execute(
        "INSERT INTO schema_versions (version, label) VALUES (?1, ?2)",
        params![step.version, step.label],
    )
    .await
    .map_err(|e| fail("record", e))?;
    tx.commit().await.map_err(|e| fail("commit", e))
}

/// Highest applied version, 0 for a new database.
pub async fn current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_versions", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("current_version: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => row
            .get::<i64>(0)
            .map_err(|e| DatabaseError::Migration(format!("current_version: {e}"))),
        Ok(None) => Ok(0),
        Err(e) => Err(DatabaseError::Migration(format!("current_version: {e}"))),
    }
}
