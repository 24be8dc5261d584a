//! Revision history use case

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    domain::{Content, RemoteId, SyncData, SyncError},
    ports::{Credential, IRemoteStorage, ISyncDataStore},
};

/// A historical version of a synced item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInfo {
    /// Provider revision id
    pub id: String,
    /// Principal who authored the revision, when known
    pub sub: Option<String>,
    /// Creation time in milliseconds since the Unix epoch
    pub created: i64,
}

/// Use case for listing and reading past revisions of a file
pub struct ReadRevisionsUseCase {
    remote: Arc<dyn IRemoteStorage + Send + Sync>,
    sync_data: Arc<dyn ISyncDataStore + Send + Sync>,
}

impl ReadRevisionsUseCase {
    pub fn new(
        remote: Arc<dyn IRemoteStorage + Send + Sync>,
        sync_data: Arc<dyn ISyncDataStore + Send + Sync>,
    ) -> Self {
        Self { remote, sync_data }
    }

    /// Lists the revisions of the object mapped to `item_id`
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`] if the item has never been synced
    pub async fn list(
        &self,
        credential: &Credential,
        item_id: &str,
    ) -> Result<Vec<RevisionInfo>, SyncError> {
        let remote_id = self.remote_id(item_id).await?;
        let revisions = self.remote.list_revisions(credential, &remote_id).await?;
        debug!(item_id, count = revisions.len(), "Listed revisions");

        Ok(revisions
            .into_iter()
            .map(|revision| RevisionInfo {
                id: revision.id,
                sub: revision.principal,
                created: revision.modified.timestamp_millis(),
            })
            .collect())
    }

    /// Reads the content of file `item_id` as of `revision_id`
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`] if the item has never been synced
    pub async fn content(
        &self,
        credential: &Credential,
        item_id: &str,
        revision_id: &str,
    ) -> Result<Content, SyncError> {
        let remote_id = self.remote_id(item_id).await?;
        let body = self
            .remote
            .download_revision(credential, &remote_id, revision_id)
            .await?;
        let text = String::from_utf8(body).map_err(|e| {
            SyncError::Parse(format!("revision {revision_id} of {remote_id} is not UTF-8: {e}"))
        })?;
        Ok(Content::parse(&text, item_id)?)
    }

    async fn remote_id(&self, item_id: &str) -> Result<RemoteId, SyncError> {
        let data: SyncData = self
            .sync_data
            .get_by_item_id(item_id)
            .await
            .map_err(SyncError::Store)?
            .ok_or_else(|| SyncError::NotFound(item_id.to_string()))?;
        Ok(RemoteId::new(data.id)?)
    }
}
