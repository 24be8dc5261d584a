//! Workspace identity

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::hashing::hash_value;
use super::newtypes::{RemoteId, WorkspaceId};

/// The sync root binding a local document tree to one remote root folder
/// and its data and trash folders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Deterministic id, see [`Workspace::make_id`]
    pub id: WorkspaceId,
    /// Owning principal
    pub sub: String,
    /// Display name (the root folder's name)
    pub name: String,
    /// Provider the workspace lives in
    pub provider_id: String,
    /// URL that reopens this workspace
    pub url: String,
    /// Remote root folder
    pub folder_id: RemoteId,
    /// Folder holding data items
    pub data_folder_id: RemoteId,
    /// Folder standing for the local trash
    pub trash_folder_id: RemoteId,
}

impl Workspace {
    /// Derives the workspace id from the provider and the root folder
    ///
    /// The id is the absolute value of the hash of the canonical form of
    /// `{providerId, folderId}`, in base 36.
    pub fn make_id(provider_id: &str, folder_id: &RemoteId) -> WorkspaceId {
        let hash = hash_value(&json!({
            "providerId": provider_id,
            "folderId": folder_id.as_str(),
        }));
        WorkspaceId::from_hash(hash.unsigned_abs())
    }

    /// Returns true if `remote_id` is one of the three workspace folders
    pub fn is_own_folder(&self, remote_id: &str) -> bool {
        self.folder_id.as_str() == remote_id
            || self.data_folder_id.as_str() == remote_id
            || self.trash_folder_id.as_str() == remote_id
    }
}

/// Navigable location identifying an open workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLocation {
    pub provider_id: String,
    pub folder_id: RemoteId,
}

impl SyncLocation {
    pub fn new(provider_id: impl Into<String>, folder_id: RemoteId) -> Self {
        Self {
            provider_id: provider_id.into(),
            folder_id,
        }
    }

    /// Renders the location as a URL fragment
    pub fn to_hash(&self) -> String {
        format!(
            "#providerId={}&folderId={}",
            self.provider_id,
            self.folder_id.as_str()
        )
    }

    /// Resolves the location against a base URL
    pub fn to_url(&self, app_url: &str) -> String {
        let base = app_url.split('#').next().unwrap_or(app_url);
        format!("{base}{}", self.to_hash())
    }
}
