//! Transfer use case
//!
//! Pushes and pulls single items and file contents, keeping the ledger
//! hashes in step with what the remote holds. Uploads are gated by hash:
//! an item whose ledger hash already matches is not sent again. Every
//! remote mutation is preceded by a check of the caller's [`Deadline`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    domain::{
        content_key, Content, Deadline, Item, ItemType, RemoteId, SyncData, SyncDataPatch,
        SyncError, Workspace, TRASH_ID,
    },
    ports::{property, Credential, IRemoteStorage, ISyncDataStore, Properties, UploadRequest},
    usecases::process_changes::ItemDeriver,
};

// ============================================================================
// TransferOutcome
// ============================================================================

/// Result of a transfer that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome<T> {
    /// The transfer ran
    Completed(T),
    /// Nothing to do, the remote already holds this version
    UpToDate,
    /// The deadline expired before the remote mutation; nothing changed
    Abandoned,
}

impl<T> TransferOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed(_))
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, TransferOutcome::Abandoned)
    }

    /// Returns the value of a completed transfer
    pub fn completed(self) -> Option<T> {
        match self {
            TransferOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TransferOutcome<U> {
        match self {
            TransferOutcome::Completed(value) => TransferOutcome::Completed(f(value)),
            TransferOutcome::UpToDate => TransferOutcome::UpToDate,
            TransferOutcome::Abandoned => TransferOutcome::Abandoned,
        }
    }
}

// ============================================================================
// TransferUseCase
// ============================================================================

/// Use case for single-item uploads and downloads
pub struct TransferUseCase {
    remote: Arc<dyn IRemoteStorage + Send + Sync>,
    sync_data: Arc<dyn ISyncDataStore + Send + Sync>,
    folder_mime_type: String,
}

impl TransferUseCase {
    /// Creates a new TransferUseCase with the required dependencies
    ///
    /// # Arguments
    ///
    /// * `remote` - Remote storage the items are transferred to and from
    /// * `sync_data` - Ledger of remote objects and their last known hashes
    /// * `folder_mime_type` - Mime type the provider uses for folders
    pub fn new(
        remote: Arc<dyn IRemoteStorage + Send + Sync>,
        sync_data: Arc<dyn ISyncDataStore + Send + Sync>,
        folder_mime_type: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            sync_data,
            folder_mime_type: folder_mime_type.into(),
        }
    }

    /// Uploads the metadata of an item
    ///
    /// Files and folders become named objects under their parent's remote
    /// folder (the root when the parent is unknown). Other items are stored
    /// in the data folder with their full JSON as name. The returned ledger
    /// entry is not persisted; the caller decides when to record it.
    pub async fn save_simple_item(
        &self,
        credential: &Credential,
        workspace: &Workspace,
        item: &Item,
        sync_data: Option<&SyncData>,
        deadline: &Deadline,
    ) -> Result<TransferOutcome<SyncData>, SyncError> {
        let request = if item.item_type.is_tree_item() {
            self.tree_item_request(workspace, item, sync_data).await?
        } else {
            target(sync_data)?
                .with_name(item.to_json()?)
                .with_parents(vec![workspace.data_folder_id.clone()])
                .with_properties(workspace_tag(workspace))
        };

        if !deadline.is_live() {
            debug!(item_id = %item.id, "Deadline expired, metadata upload abandoned");
            return Ok(TransferOutcome::Abandoned);
        }
        let object = self.remote.create_or_update(credential, &request).await?;
        debug!(item_id = %item.id, remote_id = %object.id, "Uploaded item metadata");

        Ok(TransferOutcome::Completed(SyncData::new(
            object.id.as_str(),
            item.id.clone(),
            item.item_type,
            item.hash,
        )))
    }

    /// Deletes the remote object behind a ledger entry
    ///
    /// Content entries have no object of their own and report `UpToDate`.
    pub async fn remove_item(
        &self,
        credential: &Credential,
        sync_data: &SyncData,
        deadline: &Deadline,
    ) -> Result<TransferOutcome<()>, SyncError> {
        if sync_data.is_content() {
            return Ok(TransferOutcome::UpToDate);
        }
        let remote_id = RemoteId::new(sync_data.id.clone())?;
        if !deadline.is_live() {
            debug!(remote_id = %remote_id, "Deadline expired, removal abandoned");
            return Ok(TransferOutcome::Abandoned);
        }
        self.remote.delete_object(credential, &remote_id).await?;
        debug!(remote_id = %remote_id, item_id = %sync_data.item_id, "Removed remote object");
        Ok(TransferOutcome::Completed(()))
    }

    /// Downloads the content of file `file_item_id`
    ///
    /// Returns `None` when the file or its content has never been synced.
    /// The content ledger hash is corrected when it differs from the
    /// downloaded content.
    pub async fn download_content(
        &self,
        credential: &Credential,
        file_item_id: &str,
    ) -> Result<Option<Content>, SyncError> {
        let Some(file_data) = self.lookup(file_item_id).await? else {
            return Ok(None);
        };
        let Some(content_data) = self.lookup(&content_key(file_item_id)).await? else {
            return Ok(None);
        };

        let body = self
            .remote
            .download(credential, &RemoteId::new(file_data.id.clone())?)
            .await?;
        let text = String::from_utf8(body)
            .map_err(|e| {
                SyncError::Parse(format!("content of {} is not UTF-8: {e}", file_data.id))
            })?;
        let content = Content::parse(&text, file_item_id)?;

        if content.hash != content_data.hash {
            debug!(
                item_id = %file_item_id,
                stored = content_data.hash,
                actual = content.hash,
                "Repairing content hash"
            );
            self.sync_data
                .patch(&content_data.id, SyncDataPatch::hash(content.hash))
                .await
                .map_err(SyncError::Store)?;
        }
        Ok(Some(content))
    }

    /// Downloads a data item
    ///
    /// Returns `None` when the item has never been synced. The ledger hash is
    /// corrected when it differs from the downloaded item.
    pub async fn download_data(
        &self,
        credential: &Credential,
        data_item_id: &str,
    ) -> Result<Option<Item>, SyncError> {
        let Some(data) = self.lookup(data_item_id).await? else {
            return Ok(None);
        };

        let body = self
            .remote
            .download(credential, &RemoteId::new(data.id.clone())?)
            .await?;
        let item = std::str::from_utf8(&body)
            .map_err(|e| SyncError::Parse(e.to_string()))
            .and_then(|text| Item::from_json(text).map_err(|e| SyncError::Parse(e.to_string())))?;

        if item.hash != data.hash {
            debug!(
                item_id = %data_item_id,
                stored = data.hash,
                actual = item.hash,
                "Repairing data hash"
            );
            self.sync_data
                .patch(&data.id, SyncDataPatch::hash(item.hash))
                .await
                .map_err(SyncError::Store)?;
        }
        Ok(Some(item))
    }

    /// Fetches the current metadata of a synced item
    ///
    /// Files and folders are derived from their remote object the same way
    /// the change feed derives them. Returns `None` for unsynced items and
    /// for content entries, which have no metadata.
    pub async fn download_metadata(
        &self,
        credential: &Credential,
        workspace: &Workspace,
        item_id: &str,
    ) -> Result<Option<Item>, SyncError> {
        let Some(data) = self.lookup(item_id).await? else {
            return Ok(None);
        };

        match data.item_type {
            ItemType::Data => self.download_data(credential, item_id).await,
            ItemType::Content => Ok(None),
            ItemType::File | ItemType::Folder => {
                let remote_id = RemoteId::new(data.id.clone())?;
                let object = self
                    .remote
                    .get_object(credential, &remote_id)
                    .await
                    .map_err(|source| SyncError::Access {
                        id: remote_id.to_string(),
                        source,
                    })?;
                let ledger = self.sync_data.all().await.map_err(SyncError::Store)?;
                let deriver = ItemDeriver::new(workspace, &self.folder_mime_type, &ledger);
                deriver.derive(&object).map(Some)
            }
        }
    }

    /// Uploads the content of `file`
    ///
    /// Skipped when the content ledger hash already matches. A file already
    /// mapped remotely only gets its body replaced; otherwise the object is
    /// created with metadata and body and the file is recorded in the
    /// ledger. Ledger entries are written only after the remote write
    /// succeeded.
    pub async fn upload_content(
        &self,
        credential: &Credential,
        workspace: &Workspace,
        content: &Content,
        file: &Item,
        deadline: &Deadline,
    ) -> Result<TransferOutcome<SyncData>, SyncError> {
        if let Some(existing) = self.lookup(&content.id).await? {
            if existing.hash == content.hash {
                debug!(item_id = %content.id, hash = content.hash, "Content up to date");
                return Ok(TransferOutcome::UpToDate);
            }
        }

        let body = content.serialize()?;
        let file_data = self.lookup(&file.id).await?;
        let request = match &file_data {
            Some(data) => UploadRequest::update(RemoteId::new(data.id.clone())?),
            None => self.tree_item_request(workspace, file, None).await?,
        }
        .with_media(body);

        if !deadline.is_live() {
            debug!(item_id = %file.id, "Deadline expired, content upload abandoned");
            return Ok(TransferOutcome::Abandoned);
        }
        let object = self.remote.create_or_update(credential, &request).await?;

        if file_data.is_none() {
            self.sync_data
                .patch(
                    object.id.as_str(),
                    SyncDataPatch::full(file.id.clone(), file.item_type, file.hash),
                )
                .await
                .map_err(SyncError::Store)?;
        }
        let recorded = self
            .sync_data
            .patch(
                &content_key(object.id.as_str()),
                SyncDataPatch::full(content.id.clone(), ItemType::Content, content.hash),
            )
            .await
            .map_err(SyncError::Store)?;

        info!(item_id = %file.id, remote_id = %object.id, hash = content.hash, "Uploaded content");
        Ok(TransferOutcome::Completed(recorded))
    }

    /// Uploads a data item
    ///
    /// Skipped when the ledger hash already matches. The object name is the
    /// `{id, type, hash}` summary and the body the full item.
    pub async fn upload_data(
        &self,
        credential: &Credential,
        workspace: &Workspace,
        item: &Item,
        deadline: &Deadline,
    ) -> Result<TransferOutcome<SyncData>, SyncError> {
        let existing = self.lookup(&item.id).await?;
        if existing.as_ref().is_some_and(|data| data.hash == item.hash) {
            debug!(item_id = %item.id, hash = item.hash, "Data up to date");
            return Ok(TransferOutcome::UpToDate);
        }

        let request = target(existing.as_ref())?
            .with_name(item.summary_json()?)
            .with_parents(vec![workspace.data_folder_id.clone()])
            .with_properties(workspace_tag(workspace))
            .with_media(item.to_json()?);

        if !deadline.is_live() {
            debug!(item_id = %item.id, "Deadline expired, data upload abandoned");
            return Ok(TransferOutcome::Abandoned);
        }
        let object = self.remote.create_or_update(credential, &request).await?;

        let recorded = self
            .sync_data
            .patch(
                object.id.as_str(),
                SyncDataPatch::full(item.id.clone(), item.item_type, item.hash),
            )
            .await
            .map_err(SyncError::Store)?;
        info!(item_id = %item.id, remote_id = %object.id, hash = item.hash, "Uploaded data item");
        Ok(TransferOutcome::Completed(recorded))
    }

    async fn lookup(&self, item_id: &str) -> Result<Option<SyncData>, SyncError> {
        self.sync_data
            .get_by_item_id(item_id)
            .await
            .map_err(SyncError::Store)
    }

    /// Metadata request of a file or folder
    async fn tree_item_request(
        &self,
        workspace: &Workspace,
        item: &Item,
        sync_data: Option<&SyncData>,
    ) -> Result<UploadRequest, SyncError> {
        let parent = self.parent_folder(workspace, item.parent_id.as_deref()).await?;
        let mut properties = workspace_tag(workspace);
        properties.insert(property::ID.to_string(), item.id.clone());

        let request = target(sync_data)?
            .with_name(item.name.clone().unwrap_or_default())
            .with_parents(vec![parent])
            .with_properties(properties);
        Ok(if item.item_type == ItemType::Folder {
            request.with_mime_type(self.folder_mime_type.as_str())
        } else {
            request
        })
    }

    /// Remote folder holding the children of `parent_id`
    async fn parent_folder(
        &self,
        workspace: &Workspace,
        parent_id: Option<&str>,
    ) -> Result<RemoteId, SyncError> {
        match parent_id {
            Some(TRASH_ID) => Ok(workspace.trash_folder_id.clone()),
            Some(parent_id) => match self.lookup(parent_id).await? {
                Some(parent) => Ok(RemoteId::new(parent.id)?),
                None => Ok(workspace.folder_id.clone()),
            },
            None => Ok(workspace.folder_id.clone()),
        }
    }
}

/// Update of the mapped object, or creation when unmapped
fn target(sync_data: Option<&SyncData>) -> Result<UploadRequest, SyncError> {
    match sync_data {
        Some(data) => Ok(UploadRequest::update(RemoteId::new(data.id.clone())?)),
        None => Ok(UploadRequest::create()),
    }
}

/// Property bag marking an object as part of `workspace`
fn workspace_tag(workspace: &Workspace) -> Properties {
    Properties::from([(
        property::FOLDER_ID.to_string(),
        workspace.folder_id.to_string(),
    )])
}
