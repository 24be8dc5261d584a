//! Domain entities and business logic
//!
//! This module contains the core domain types for TreeSync:
//! - Newtypes for validated remote identifiers and tokens
//! - Canonical serialization and the item hash function
//! - Local items, file contents and the sync-data ledger
//! - Workspace identity
//! - Change-feed results and the cooperative cancellation predicate
//! - Domain-specific error types

pub mod change;
pub mod content;
pub mod deadline;
pub mod errors;
pub mod hashing;
pub mod item;
pub mod newtypes;
pub mod sync_data;
pub mod workspace;

// Re-export commonly used types
pub use change::{Change, ChangeBatch, ChangeKind};
pub use content::Content;
pub use deadline::Deadline;
pub use errors::{DomainError, SyncError};
pub use item::{Item, ItemType, TRASH_ID};
pub use newtypes::*;
pub use sync_data::{content_key, SyncData, SyncDataPatch, CONTENT_SENTINEL_HASH};
pub use workspace::{SyncLocation, Workspace};
