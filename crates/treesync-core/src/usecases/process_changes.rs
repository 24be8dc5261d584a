//! Change feed use case
//!
//! Reads the remote change feed since the last applied page token and turns
//! each entry into a classified [`Change`]:
//!
//! 1. A `remote id -> local item id` lookup is built from the ledger and
//!    from the `id` property of every object in the batch, so parents
//!    created in the same batch resolve without another round trip.
//! 2. Entries about the workspace's own folders are skipped, as are objects
//!    whose `folderId` property does not name this workspace.
//! 3. Objects in the data folder carry their item as JSON in their name;
//!    a malformed name drops the entry. Other objects are files or folders.
//! 4. Every file upsert is followed by a synthetic content change carrying
//!    [`CONTENT_SENTINEL_HASH`], and every removal of a file by the removal
//!    of its content entry.
//!
//! The batch is returned without persisting the new page token; see
//! [`ProcessChangesUseCase::apply`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Map;
use tracing::{debug, info, warn};

use crate::{
    domain::{
        content_key, Change, ChangeBatch, Item, ItemType, SyncData, SyncError, Workspace,
        CONTENT_SENTINEL_HASH, TRASH_ID,
    },
    ports::{
        property, ChangeFeedEntry, Credential, IRemoteStorage, IStateRepository, ISyncDataStore,
        RemoteObject,
    },
};

// ============================================================================
// ItemDeriver
// ============================================================================

/// Derives local items from remote objects of one workspace
pub struct ItemDeriver<'a> {
    workspace: &'a Workspace,
    folder_mime_type: &'a str,
    parent_ids: HashMap<String, String>,
}

impl<'a> ItemDeriver<'a> {
    /// Creates a deriver resolving parents through the given ledger entries
    pub fn new(workspace: &'a Workspace, folder_mime_type: &'a str, ledger: &[SyncData]) -> Self {
        let parent_ids = ledger
            .iter()
            .map(|entry| (entry.id.clone(), entry.item_id.clone()))
            .collect();
        Self {
            workspace,
            folder_mime_type,
            parent_ids,
        }
    }

    /// Makes the local id of `object` resolvable as a parent
    pub fn learn(&mut self, object: &RemoteObject) {
        if let Some(item_id) = object.property(property::ID) {
            self.parent_ids
                .insert(object.id.to_string(), item_id.to_string());
        }
    }

    /// Returns true if the object is tagged as part of this workspace
    pub fn belongs(&self, object: &RemoteObject) -> bool {
        object.property(property::FOLDER_ID) == Some(self.workspace.folder_id.as_str())
    }

    /// Derives the item an object of this workspace stands for
    ///
    /// # Errors
    ///
    /// [`SyncError::Parse`] if a data object's name is not an item, or a
    /// file or folder lacks its `id` property
    pub fn derive(&self, object: &RemoteObject) -> Result<Item, SyncError> {
        if object.first_parent() == Some(&self.workspace.data_folder_id) {
            return Item::from_json(&object.name).map_err(|e| SyncError::Parse(e.to_string()));
        }

        let item_id = object.property(property::ID).ok_or_else(|| {
            SyncError::Parse(format!("object {} has no item id property", object.id))
        })?;
        let item_type = if object.mime_type == self.folder_mime_type {
            ItemType::Folder
        } else {
            ItemType::File
        };

        let item = Item {
            id: item_id.to_string(),
            item_type,
            name: Some(object.name.clone()),
            parent_id: self.resolve_parent(object),
            hash: 0,
            data: Map::new(),
        };
        Ok(item.with_computed_hash()?)
    }

    /// Trash wins over any other parent; otherwise the first known parent in
    /// remote order, or the root
    fn resolve_parent(&self, object: &RemoteObject) -> Option<String> {
        if object.has_parent(&self.workspace.trash_folder_id) {
            return Some(TRASH_ID.to_string());
        }
        object
            .parents
            .iter()
            .find_map(|parent| self.parent_ids.get(parent.as_str()).cloned())
    }
}

/// Classifies a run of feed entries against a ledger snapshot
///
/// Pure: the same entries and snapshot always give the same changes.
pub fn classify(
    workspace: &Workspace,
    folder_mime_type: &str,
    entries: &[ChangeFeedEntry],
    ledger: &[SyncData],
) -> Vec<Change> {
    let mut deriver = ItemDeriver::new(workspace, folder_mime_type, ledger);
    for object in entries.iter().filter_map(|entry| entry.file.as_ref()) {
        deriver.learn(object);
    }
    let ledger_by_id: HashMap<&str, &SyncData> =
        ledger.iter().map(|entry| (entry.id.as_str(), entry)).collect();

    let mut changes = Vec::with_capacity(entries.len());
    for entry in entries {
        let remote_id = entry.file_id.as_str();
        if workspace.is_own_folder(remote_id) {
            continue;
        }

        let Some(object) = &entry.file else {
            changes.push(Change::removal(remote_id));
            if ledger_by_id
                .get(remote_id)
                .is_some_and(|data| data.item_type == ItemType::File)
            {
                changes.push(Change::removal(content_key(remote_id)));
            }
            continue;
        };

        if !deriver.belongs(object) {
            debug!(remote_id, "Skipping object outside the workspace");
            continue;
        }

        let item = match deriver.derive(object) {
            Ok(item) => item,
            Err(e) => {
                warn!(remote_id, error = %e, "Dropping unreadable feed entry");
                continue;
            }
        };

        let sync_data = SyncData::new(remote_id, item.id.clone(), item.item_type, item.hash);
        let content =
            (item.item_type == ItemType::File).then(|| content_change(remote_id, &item.id));
        changes.push(Change::upsert(item, sync_data));
        if let Some(content) = content {
            changes.push(content);
        }
    }
    changes
}

/// The content change paired with a file upsert
///
/// The feed carries no content hash, so the sentinel forces a download.
fn content_change(remote_id: &str, item_id: &str) -> Change {
    let item = Item {
        id: content_key(item_id),
        item_type: ItemType::Content,
        name: None,
        parent_id: None,
        hash: CONTENT_SENTINEL_HASH,
        data: Map::new(),
    };
    let sync_data = SyncData::new(
        content_key(remote_id),
        content_key(item_id),
        ItemType::Content,
        CONTENT_SENTINEL_HASH,
    );
    Change::upsert(item, sync_data)
}

// ============================================================================
// ProcessChangesUseCase
// ============================================================================

/// Use case for reading and applying the remote change feed
pub struct ProcessChangesUseCase {
    remote: Arc<dyn IRemoteStorage + Send + Sync>,
    sync_data: Arc<dyn ISyncDataStore + Send + Sync>,
    state: Arc<dyn IStateRepository + Send + Sync>,
    folder_mime_type: String,
    include_removed: bool,
}

impl ProcessChangesUseCase {
    /// Creates a new ProcessChangesUseCase with the required dependencies
    pub fn new(
        remote: Arc<dyn IRemoteStorage + Send + Sync>,
        sync_data: Arc<dyn ISyncDataStore + Send + Sync>,
        state: Arc<dyn IStateRepository + Send + Sync>,
        folder_mime_type: impl Into<String>,
        include_removed: bool,
    ) -> Self {
        Self {
            remote,
            sync_data,
            state,
            folder_mime_type: folder_mime_type.into(),
            include_removed,
        }
    }

    /// Reads and classifies every feed entry since the stored page token
    ///
    /// Nothing is persisted; hand the batch to [`apply`](Self::apply) once
    /// its changes have been taken into account.
    pub async fn fetch(
        &self,
        credential: &Credential,
        workspace: &Workspace,
    ) -> Result<ChangeBatch, SyncError> {
        let token = self
            .state
            .get_page_token(&workspace.id)
            .await
            .map_err(SyncError::Store)?;
        let page = self
            .remote
            .get_changes(credential, token.as_ref(), self.include_removed)
            .await?;
        let ledger = self.sync_data.all().await.map_err(SyncError::Store)?;

        let changes = classify(workspace, &self.folder_mime_type, &page.entries, &ledger);
        debug!(
            entries = page.entries.len(),
            changes = changes.len(),
            "Classified change feed"
        );

        Ok(ChangeBatch {
            changes,
            next_page_token: page.next_page_token,
        })
    }

    /// Records that `batch` has been applied by persisting its page token
    pub async fn apply(&self, workspace: &Workspace, batch: &ChangeBatch) -> Result<(), SyncError> {
        self.state
            .save_page_token(&workspace.id, &batch.next_page_token)
            .await
            .map_err(SyncError::Store)
    }

    /// Fetches the next batch and persists its page token
    pub async fn execute(
        &self,
        credential: &Credential,
        workspace: &Workspace,
    ) -> Result<Vec<Change>, SyncError> {
        let batch = self.fetch(credential, workspace).await?;
        self.apply(workspace, &batch).await?;
        if !batch.is_empty() {
            info!(changes = batch.len(), "Received remote changes");
        }
        Ok(batch.changes)
    }
}
