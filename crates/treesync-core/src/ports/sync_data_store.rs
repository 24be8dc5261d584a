//! Sync-data store port (driven/secondary port)
//!
//! The ledger mapping remote object ids to the local items they mirror.
//!
//! ## Design Notes
//!
//! - Updates are merge-patches: fields not named in a [`SyncDataPatch`] keep
//!   their stored value, so concurrent updates of different fields never
//!   clobber each other.
//! - Implementations must apply a patch atomically (one upsert statement,
//!   one locked map entry).

use crate::domain::{SyncData, SyncDataPatch};

/// Port trait for the sync-data ledger
#[async_trait::async_trait]
pub trait ISyncDataStore: Send + Sync {
    /// Looks up an entry by remote id (or `<fileId>/content` key)
    async fn get(&self, id: &str) -> anyhow::Result<Option<SyncData>>;

    /// Looks up the entry mapping the given local item
    async fn get_by_item_id(&self, item_id: &str) -> anyhow::Result<Option<SyncData>>;

    /// Returns every entry
    async fn all(&self) -> anyhow::Result<Vec<SyncData>>;

    /// Merges `patch` into the entry `id`, creating it if absent
    ///
    /// # Returns
    /// The entry as stored after the merge
    ///
    /// # Errors
    /// Fails when creating an entry without `item_id` and `item_type`
    async fn patch(&self, id: &str, patch: SyncDataPatch) -> anyhow::Result<SyncData>;

    /// Removes an entry; removing a missing entry is not an error
    async fn remove(&self, id: &str) -> anyhow::Result<()>;
}
