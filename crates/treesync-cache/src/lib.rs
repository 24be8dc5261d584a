//! TreeSync Cache - adapters for the local state ports
//!
//! Two interchangeable backends implement `ISyncDataStore` and
//! `IStateRepository` from `treesync-core`:
//!
//! - [`SqliteStateRepository`] over a [`DatabasePool`], for state that must
//!   survive a restart (ledger, workspace records, page tokens, location)
//! - [`MemorySyncDataStore`] and [`MemoryStateRepository`], for tests and
//!   embedders that persist elsewhere
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use treesync_cache::{DatabasePool, SqliteStateRepository};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let db = DatabasePool::new(Path::new("/tmp/treesync/treesync.db")).await?;
//! let ledger = SqliteStateRepository::new(db.pool().clone());
//! // `ledger` serves both ISyncDataStore and IStateRepository
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod pool;
pub mod repository;

pub use memory::{MemoryStateRepository, MemorySyncDataStore};
pub use pool::DatabasePool;
pub use repository::SqliteStateRepository;

/// Errors raised while opening or reading the local state database
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The database file could not be created or opened
    #[error("Cannot open database: {0}")]
    Open(String),

    /// A schema migration failed
    #[error("Migration to schema version {version} failed: {message}")]
    Schema { version: i64, message: String },

    /// The database was written by a newer schema than this build knows
    #[error("Database schema version {found} is newer than supported version {supported}")]
    NewerSchema { found: i64, supported: i64 },

    /// A query failed
    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// A stored row does not decode into a domain value
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}
