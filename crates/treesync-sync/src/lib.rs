//! TreeSync Sync - engine facade for the document-tree collaborators
//!
//! Provides:
//! - Workspace resolution and resumption
//! - Two-phase change feed polling
//! - Hash-gated pushes and lazy-repair fetches of single items
//! - Revision history
//!
//! ## Modules
//!
//! - [`engine`] - The [`SyncEngine`] facade wiring the core use cases to ports
//! - [`scheduler`] - Periodic change feed polling
//! - [`logging`] - Tracing subscriber initialisation

pub mod engine;
pub mod logging;
pub mod scheduler;

use std::sync::Arc;

use thiserror::Error;
use treesync_cache::{
    DatabasePool, MemoryStateRepository, MemorySyncDataStore, SqliteStateRepository,
};
use treesync_core::{
    config::Config,
    ports::{IStateRepository, ISyncDataStore},
};

pub use engine::SyncEngine;
pub use scheduler::PollScheduler;

/// Errors raised while assembling the engine's local state
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configuration did not validate
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The local database could not be opened
    #[error("Storage error: {0}")]
    Storage(#[from] treesync_cache::CacheError),
}

/// Ledger and state handles backing one engine
pub struct LocalState {
    pub sync_data: Arc<dyn ISyncDataStore + Send + Sync>,
    pub state: Arc<dyn IStateRepository + Send + Sync>,
}

impl LocalState {
    /// State kept only for the lifetime of the process
    pub fn in_memory() -> Self {
        Self {
            sync_data: Arc::new(MemorySyncDataStore::new()),
            state: Arc::new(MemoryStateRepository::new()),
        }
    }

    /// Opens the SQLite database named in `config`, after validating it
    pub async fn open(config: &Config) -> Result<Self, SetupError> {
        let errors = config.validate();
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SetupError::InvalidConfig(message));
        }

        let pool = DatabasePool::new(&config.storage.database).await?;
        let repository = Arc::new(SqliteStateRepository::new(pool.pool().clone()));
        Ok(Self {
            sync_data: repository.clone(),
            state: repository,
        })
    }
}
