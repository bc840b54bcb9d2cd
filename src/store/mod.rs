//! Persistence layer — snapshot storage for in-progress onboarding sessions.

pub mod autosave;
pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use autosave::{AutoSaveConfig, AutoSaver};
pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use traits::PersistenceAdapter;
