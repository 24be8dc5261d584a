//! Workspace bootstrap use case
//!
//! Resolves a remote root folder into a fully populated [`Workspace`]:
//! creates the root when none is given, makes sure the data and trash
//! folders exist, and repairs the root's property bag when a previous run
//! stopped half way.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    config::WorkspaceConfig,
    domain::{RemoteId, SyncError, SyncLocation, Workspace},
    ports::{
        property, Credential, IRemoteStorage, IStateRepository, Properties, RemoteObject,
        UploadRequest,
    },
};

/// Use case for opening (or creating) a workspace
pub struct BootstrapWorkspaceUseCase {
    remote: Arc<dyn IRemoteStorage + Send + Sync>,
    state: Arc<dyn IStateRepository + Send + Sync>,
    settings: WorkspaceConfig,
}

impl BootstrapWorkspaceUseCase {
    /// Creates a new BootstrapWorkspaceUseCase with the required dependencies
    ///
    /// # Arguments
    ///
    /// * `remote` - Remote storage holding the workspace folders
    /// * `state` - Repository of workspace records and the current location
    /// * `settings` - Folder names, provider id and app URL
    pub fn new(
        remote: Arc<dyn IRemoteStorage + Send + Sync>,
        state: Arc<dyn IStateRepository + Send + Sync>,
        settings: WorkspaceConfig,
    ) -> Self {
        Self {
            remote,
            state,
            settings,
        }
    }

    /// Opens the workspace rooted at `folder_id`, creating a new root folder
    /// when `folder_id` is `None`
    ///
    /// A workspace already stored for the folder is returned without any
    /// remote call.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Unauthorized`] if the credential cannot host a workspace
    /// - [`SyncError::Access`] if the root folder cannot be read
    /// - [`SyncError::Conflict`] if the root folder belongs to another workspace
    pub async fn execute(
        &self,
        credential: &Credential,
        folder_id: Option<&RemoteId>,
    ) -> Result<Workspace, SyncError> {
        if !credential.can_host_workspace() {
            return Err(SyncError::Unauthorized(format!(
                "credential of {} lacks full drive access",
                credential.sub
            )));
        }

        let folder_id = match folder_id {
            Some(id) => id.clone(),
            None => self.create_root(credential).await?,
        };

        let workspace_id = Workspace::make_id(&self.settings.provider_id, &folder_id);
        if let Some(workspace) = self
            .state
            .get_workspace(&workspace_id)
            .await
            .map_err(SyncError::Store)?
        {
            debug!(workspace_id = %workspace.id, "Workspace already initialized");
            self.publish_location(&workspace.folder_id).await?;
            return Ok(workspace);
        }

        let folder = self
            .remote
            .get_object(credential, &folder_id)
            .await
            .map_err(|source| SyncError::Access {
                id: folder_id.to_string(),
                source,
            })?;

        if let Some(claimed_by) = folder.property(property::FOLDER_ID) {
            if claimed_by != folder_id.as_str() {
                warn!(folder_id = %folder_id, claimed_by, "Folder belongs to another workspace");
                return Err(SyncError::Conflict {
                    folder_id: folder_id.to_string(),
                    claimed_by: claimed_by.to_string(),
                });
            }
        }

        self.init_folder(credential, &folder).await
    }

    /// Creates a fresh root folder and initializes it
    async fn create_root(&self, credential: &Credential) -> Result<RemoteId, SyncError> {
        let request = UploadRequest::create()
            .with_name(self.settings.root_folder_name.as_str())
            .with_parents(Vec::new())
            .with_mime_type(self.settings.folder_mime_type.as_str());
        let mut folder = self.remote.create_or_update(credential, &request).await?;
        info!(folder_id = %folder.id, "Created workspace root folder");

        folder.properties.clear();
        self.init_folder(credential, &folder).await?;
        Ok(folder.id)
    }

    async fn init_folder(
        &self,
        credential: &Credential,
        folder: &RemoteObject,
    ) -> Result<Workspace, SyncError> {
        let data_folder_id = match stored_id(folder, property::DATA_FOLDER_ID)? {
            Some(id) => id,
            None => {
                self.create_child_folder(credential, folder, &self.settings.data_folder_name)
                    .await?
            }
        };
        let trash_folder_id = match stored_id(folder, property::TRASH_FOLDER_ID)? {
            Some(id) => id,
            None => {
                self.create_child_folder(credential, folder, &self.settings.trash_folder_name)
                    .await?
            }
        };

        let properties = Properties::from([
            (property::FOLDER_ID.to_string(), folder.id.to_string()),
            (property::DATA_FOLDER_ID.to_string(), data_folder_id.to_string()),
            (property::TRASH_FOLDER_ID.to_string(), trash_folder_id.to_string()),
        ]);
        let diverges = properties
            .iter()
            .any(|(key, value)| folder.property(key) != Some(value.as_str()));
        if diverges {
            debug!(folder_id = %folder.id, "Repairing workspace folder properties");
            let request = UploadRequest::update(folder.id.clone())
                .with_properties(properties)
                .with_mime_type(self.settings.folder_mime_type.as_str());
            self.remote.create_or_update(credential, &request).await?;
        }

        let location = self.publish_location(&folder.id).await?;
        let workspace = Workspace {
            id: Workspace::make_id(&self.settings.provider_id, &folder.id),
            sub: credential.sub.clone(),
            name: folder.name.clone(),
            provider_id: self.settings.provider_id.clone(),
            url: location.to_url(&self.settings.app_url),
            folder_id: folder.id.clone(),
            data_folder_id,
            trash_folder_id,
        };
        self.state
            .save_workspace(&workspace)
            .await
            .map_err(SyncError::Store)?;

        info!(workspace_id = %workspace.id, folder_id = %workspace.folder_id, "Workspace ready");
        Ok(workspace)
    }

    async fn create_child_folder(
        &self,
        credential: &Credential,
        root: &RemoteObject,
        name: &str,
    ) -> Result<RemoteId, SyncError> {
        let request = UploadRequest::create()
            .with_name(name)
            .with_parents(vec![root.id.clone()])
            .with_properties(Properties::from([(
                property::FOLDER_ID.to_string(),
                root.id.to_string(),
            )]))
            .with_mime_type(self.settings.folder_mime_type.as_str());
        let folder = self.remote.create_or_update(credential, &request).await?;
        debug!(folder_id = %folder.id, name, "Created workspace folder");
        Ok(folder.id)
    }

    /// Stores the location of the workspace if it changed
    async fn publish_location(&self, folder_id: &RemoteId) -> Result<SyncLocation, SyncError> {
        let location = SyncLocation::new(self.settings.provider_id.as_str(), folder_id.clone());
        let current = self.state.get_location().await.map_err(SyncError::Store)?;
        if current.as_ref() != Some(&location) {
            self.state
                .save_location(&location)
                .await
                .map_err(SyncError::Store)?;
        }
        Ok(location)
    }
}

/// Reads a folder id from the property bag; empty values count as missing
fn stored_id(folder: &RemoteObject, key: &str) -> Result<Option<RemoteId>, SyncError> {
    match folder.property(key).filter(|value| !value.is_empty()) {
        Some(value) => Ok(Some(RemoteId::new(value.to_string())?)),
        None => Ok(None),
    }
}
