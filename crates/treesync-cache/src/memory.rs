//! In-memory implementations of the state ports
//!
//! Backed by [`DashMap`] for lock-free concurrent access. Used by tests and
//! by embedders that keep their own persistence.

use std::sync::RwLock;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use treesync_core::domain::{
    PageToken, SyncData, SyncDataPatch, SyncLocation, Workspace, WorkspaceId,
};
use treesync_core::ports::{IStateRepository, ISyncDataStore};

/// Sync-data ledger held in memory
///
/// Keeps a reverse `item_id -> id` index next to the entries.
pub struct MemorySyncDataStore {
    /// id -> entry mapping
    by_id: DashMap<String, SyncData>,
    /// item_id -> id mapping (reverse lookup)
    by_item_id: DashMap<String, String>,
}

impl MemorySyncDataStore {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_item_id: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for MemorySyncDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ISyncDataStore for MemorySyncDataStore {
    async fn get(&self, id: &str) -> anyhow::Result<Option<SyncData>> {
        Ok(self.by_id.get(id).map(|r| r.value().clone()))
    }

    async fn get_by_item_id(&self, item_id: &str) -> anyhow::Result<Option<SyncData>> {
        let Some(id) = self.by_item_id.get(item_id).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        Ok(self.by_id.get(&id).map(|r| r.value().clone()))
    }

    async fn all(&self) -> anyhow::Result<Vec<SyncData>> {
        let mut entries: Vec<SyncData> = self.by_id.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    async fn patch(&self, id: &str, patch: SyncDataPatch) -> anyhow::Result<SyncData> {
        // The entry guard holds the shard lock for the whole merge.
        let (merged, previous_item_id) = match self.by_id.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                let merged = patch.apply(id, Some(entry.get()))?;
                let previous = entry.insert(merged.clone()).item_id;
                (merged, Some(previous))
            }
            Entry::Vacant(entry) => {
                let created = patch.apply(id, None)?;
                entry.insert(created.clone());
                (created, None)
            }
        };

        if let Some(previous) = previous_item_id.filter(|p| *p != merged.item_id) {
            self.by_item_id.remove_if(&previous, |_, mapped| mapped == id);
        }
        self.by_item_id
            .insert(merged.item_id.clone(), merged.id.clone());
        Ok(merged)
    }

    async fn remove(&self, id: &str) -> anyhow::Result<()> {
        if let Some((_, entry)) = self.by_id.remove(id) {
            self.by_item_id.remove_if(&entry.item_id, |_, mapped| mapped == id);
        }
        Ok(())
    }
}

/// Workspace state held in memory
#[derive(Default)]
pub struct MemoryStateRepository {
    workspaces: DashMap<String, Workspace>,
    page_tokens: DashMap<String, PageToken>,
    location: RwLock<Option<SyncLocation>>,
}

impl MemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IStateRepository for MemoryStateRepository {
    async fn get_workspace(&self, id: &WorkspaceId) -> anyhow::Result<Option<Workspace>> {
        Ok(self.workspaces.get(id.as_str()).map(|r| r.value().clone()))
    }

    async fn save_workspace(&self, workspace: &Workspace) -> anyhow::Result<()> {
        self.workspaces
            .insert(workspace.id.to_string(), workspace.clone());
        Ok(())
    }

    async fn get_page_token(
        &self,
        workspace_id: &WorkspaceId,
    ) -> anyhow::Result<Option<PageToken>> {
        Ok(self
            .page_tokens
            .get(workspace_id.as_str())
            .map(|r| r.value().clone()))
    }

    async fn save_page_token(
        &self,
        workspace_id: &WorkspaceId,
        token: &PageToken,
    ) -> anyhow::Result<()> {
        self.page_tokens
            .insert(workspace_id.to_string(), token.clone());
        Ok(())
    }

    async fn get_location(&self) -> anyhow::Result<Option<SyncLocation>> {
        let location = self
            .location
            .read()
            .map_err(|_| anyhow::anyhow!("location lock poisoned"))?;
        Ok(location.clone())
    }

    async fn save_location(&self, location: &SyncLocation) -> anyhow::Result<()> {
        let mut current = self
            .location
            .write()
            .map_err(|_| anyhow::anyhow!("location lock poisoned"))?;
        *current = Some(location.clone());
        Ok(())
    }
}
