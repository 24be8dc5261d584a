//! Sync engine facade
//!
//! The [`SyncEngine`] is the surface the document-tree collaborators talk
//! to. It owns the credential, the ports and the resolved [`Workspace`], and
//! wires them into the core use cases:
//!
//! 1. **Resolve**: bootstrap (or resume) the workspace once per activation
//! 2. **Pull**: read the change feed, hand the batch to the caller, then
//!    persist the page token once the batch has been applied
//! 3. **Push / fetch**: transfer single items, gated by hashes and by the
//!    caller's [`Deadline`]
//!
//! No operation retries internally; transport failures surface as
//! [`SyncError::Transport`] and the caller decides when to try again.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use treesync_core::config::Config;
use treesync_core::domain::{
    Change, ChangeBatch, Content, Deadline, DomainError, Item, ItemType, RemoteId, SyncData,
    SyncDataPatch, SyncError, Workspace,
};
use treesync_core::ports::{Credential, IRemoteStorage, IStateRepository, ISyncDataStore};
use treesync_core::usecases::{
    BootstrapWorkspaceUseCase, ProcessChangesUseCase, ReadRevisionsUseCase, RevisionInfo,
    TransferOutcome, TransferUseCase,
};

// ============================================================================
// SyncEngine
// ============================================================================

/// Reconciles one workspace of a local document tree with remote storage
///
/// ## Dependencies
///
/// - `remote`: Remote object storage and its change feed
/// - `sync_data`: Ledger mapping remote objects to local items
/// - `state`: Workspace records, page tokens and the current location
pub struct SyncEngine {
    credential: Credential,
    provider_id: String,
    sync_data: Arc<dyn ISyncDataStore + Send + Sync>,
    state: Arc<dyn IStateRepository + Send + Sync>,
    bootstrap: BootstrapWorkspaceUseCase,
    changes: ProcessChangesUseCase,
    transfer: TransferUseCase,
    revisions: ReadRevisionsUseCase,
    /// Workspace published by the last successful resolution
    workspace: RwLock<Option<Workspace>>,
}

impl SyncEngine {
    /// Creates a new `SyncEngine` with the given dependencies
    ///
    /// # Arguments
    /// * `remote` - Remote storage operations (IRemoteStorage)
    /// * `sync_data` - Sync-data ledger (ISyncDataStore)
    /// * `state` - Workspace state persistence (IStateRepository)
    /// * `credential` - Credential every remote call is made with
    /// * `config` - Application configuration for workspace and sync settings
    pub fn new(
        remote: Arc<dyn IRemoteStorage + Send + Sync>,
        sync_data: Arc<dyn ISyncDataStore + Send + Sync>,
        state: Arc<dyn IStateRepository + Send + Sync>,
        credential: Credential,
        config: &Config,
    ) -> Self {
        let folder_mime_type = config.workspace.folder_mime_type.clone();
        Self {
            credential,
            provider_id: config.workspace.provider_id.clone(),
            bootstrap: BootstrapWorkspaceUseCase::new(
                remote.clone(),
                state.clone(),
                config.workspace.clone(),
            ),
            changes: ProcessChangesUseCase::new(
                remote.clone(),
                sync_data.clone(),
                state.clone(),
                folder_mime_type.clone(),
                config.sync.include_removed,
            ),
            transfer: TransferUseCase::new(remote.clone(), sync_data.clone(), folder_mime_type),
            revisions: ReadRevisionsUseCase::new(remote, sync_data.clone()),
            sync_data,
            state,
            workspace: RwLock::new(None),
        }
    }

    // ========================================================================
    // Workspace
    // ========================================================================

    /// Opens the workspace rooted at `folder_id`, or a new one when `None`
    ///
    /// On success the workspace becomes the target of every other operation.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Conflict`] if the folder belongs to another workspace
    /// - [`SyncError::Access`] if the folder cannot be read
    /// - [`SyncError::Unauthorized`] if the credential cannot host a workspace
    #[tracing::instrument(skip(self))]
    pub async fn resolve_workspace(
        &self,
        folder_id: Option<&RemoteId>,
    ) -> Result<Workspace, SyncError> {
        let workspace = self.bootstrap.execute(&self.credential, folder_id).await?;
        info!(
            workspace_id = %workspace.id,
            folder_id = %workspace.folder_id,
            "Workspace resolved"
        );
        *self.workspace.write().await = Some(workspace.clone());
        Ok(workspace)
    }

    /// Reopens the workspace of the saved location
    ///
    /// Falls back to creating a new workspace when no location was saved or
    /// the saved one belongs to another provider.
    #[tracing::instrument(skip(self))]
    pub async fn resume_workspace(&self) -> Result<Workspace, SyncError> {
        let location = self
            .state
            .get_location()
            .await
            .map_err(SyncError::Store)?
            .filter(|location| location.provider_id == self.provider_id);
        debug!(resumed = location.is_some(), "Resuming workspace");
        self.resolve_workspace(location.as_ref().map(|l| &l.folder_id))
            .await
    }

    /// Returns the resolved workspace, if any
    pub async fn workspace(&self) -> Option<Workspace> {
        self.workspace.read().await.clone()
    }

    async fn current(&self) -> Result<Workspace, SyncError> {
        self.workspace
            .read()
            .await
            .clone()
            .ok_or(SyncError::WorkspaceNotResolved)
    }

    // ========================================================================
    // Change feed
    // ========================================================================

    /// Reads the change feed without recording the batch as applied
    #[tracing::instrument(skip(self))]
    pub async fn get_changes(&self) -> Result<ChangeBatch, SyncError> {
        let workspace = self.current().await?;
        self.changes.fetch(&self.credential, &workspace).await
    }

    /// Records `batch` as applied so the next read starts after it
    #[tracing::instrument(skip(self, batch), fields(changes = batch.len()))]
    pub async fn set_applied_changes(&self, batch: &ChangeBatch) -> Result<(), SyncError> {
        let workspace = self.current().await?;
        self.changes.apply(&workspace, batch).await
    }

    /// Reads the change feed and records it as applied
    #[tracing::instrument(skip(self))]
    pub async fn poll_changes(&self) -> Result<Vec<Change>, SyncError> {
        let workspace = self.current().await?;
        self.changes.execute(&self.credential, &workspace).await
    }

    // ========================================================================
    // Push
    // ========================================================================

    /// Uploads the metadata of `item` and records the mapping
    ///
    /// `sync_data` is the item's current ledger entry; without one a new
    /// remote object is created.
    #[tracing::instrument(skip(self, item, deadline), fields(item_id = %item.id))]
    pub async fn apply_local_item(
        &self,
        item: &Item,
        sync_data: Option<&SyncData>,
        deadline: &Deadline,
    ) -> Result<TransferOutcome<SyncData>, SyncError> {
        let workspace = self.current().await?;
        let outcome = self
            .transfer
            .save_simple_item(&self.credential, &workspace, item, sync_data, deadline)
            .await?;

        match outcome {
            TransferOutcome::Completed(data) => {
                let recorded = self
                    .sync_data
                    .patch(
                        &data.id,
                        SyncDataPatch::full(data.item_id.clone(), data.item_type, data.hash),
                    )
                    .await
                    .map_err(SyncError::Store)?;
                Ok(TransferOutcome::Completed(recorded))
            }
            other => Ok(other),
        }
    }

    /// Deletes the remote object behind `sync_data` and forgets the mapping
    ///
    /// The ledger entry is kept when the deadline expired.
    #[tracing::instrument(skip(self, deadline))]
    pub async fn remove_remote_mapping(
        &self,
        sync_data: &SyncData,
        deadline: &Deadline,
    ) -> Result<TransferOutcome<()>, SyncError> {
        self.current().await?;
        let outcome = self
            .transfer
            .remove_item(&self.credential, sync_data, deadline)
            .await?;
        if !outcome.is_abandoned() {
            self.sync_data
                .remove(&sync_data.id)
                .await
                .map_err(SyncError::Store)?;
        }
        Ok(outcome)
    }

    /// Uploads the content of `file`, unless its hash is already recorded
    #[tracing::instrument(skip(self, content, file, deadline), fields(item_id = %file.id))]
    pub async fn push_content(
        &self,
        content: &Content,
        file: &Item,
        deadline: &Deadline,
    ) -> Result<TransferOutcome<SyncData>, SyncError> {
        let workspace = self.current().await?;
        self.transfer
            .upload_content(&self.credential, &workspace, content, file, deadline)
            .await
    }

    /// Uploads the metadata of any item, unless its hash is already recorded
    ///
    /// Files and folders go through [`apply_local_item`](Self::apply_local_item);
    /// other items are stored whole in the data folder.
    #[tracing::instrument(skip(self, item, deadline), fields(item_id = %item.id))]
    pub async fn push_metadata(
        &self,
        item: &Item,
        deadline: &Deadline,
    ) -> Result<TransferOutcome<SyncData>, SyncError> {
        let workspace = self.current().await?;
        match item.item_type {
            ItemType::File | ItemType::Folder => {
                let existing = self
                    .sync_data
                    .get_by_item_id(&item.id)
                    .await
                    .map_err(SyncError::Store)?;
                if existing.as_ref().is_some_and(|data| data.hash == item.hash) {
                    debug!(hash = item.hash, "Metadata up to date");
                    return Ok(TransferOutcome::UpToDate);
                }
                self.apply_local_item(item, existing.as_ref(), deadline).await
            }
            ItemType::Content => Err(DomainError::ValidationFailed(format!(
                "{} is content, push it with push_content",
                item.id
            ))
            .into()),
            ItemType::Data => {
                self.transfer
                    .upload_data(&self.credential, &workspace, item, deadline)
                    .await
            }
        }
    }

    // ========================================================================
    // Fetch
    // ========================================================================

    /// Downloads the content of file `file_item_id`
    ///
    /// Returns `None` when the file or its content was never synced.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_content(&self, file_item_id: &str) -> Result<Option<Content>, SyncError> {
        self.current().await?;
        self.transfer
            .download_content(&self.credential, file_item_id)
            .await
    }

    /// Fetches the current remote metadata of item `item_id`
    ///
    /// Returns `None` for unsynced items and content entries.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_metadata(&self, item_id: &str) -> Result<Option<Item>, SyncError> {
        let workspace = self.current().await?;
        self.transfer
            .download_metadata(&self.credential, &workspace, item_id)
            .await
    }

    // ========================================================================
    // Revisions
    // ========================================================================

    /// Lists the past revisions of item `item_id`
    #[tracing::instrument(skip(self))]
    pub async fn get_revision_history(
        &self,
        item_id: &str,
    ) -> Result<Vec<RevisionInfo>, SyncError> {
        self.current().await?;
        self.revisions.list(&self.credential, item_id).await
    }

    /// Reads file `item_id` as of revision `revision_id`
    #[tracing::instrument(skip(self))]
    pub async fn get_revision_content(
        &self,
        item_id: &str,
        revision_id: &str,
    ) -> Result<Content, SyncError> {
        self.current().await?;
        self.revisions
            .content(&self.credential, item_id, revision_id)
            .await
    }
}
