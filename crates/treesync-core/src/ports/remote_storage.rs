//! Remote storage port (driven/secondary port)
//!
//! This module defines the interface to the remote object-storage provider.
//! The provider offers a flat file/folder model, a string property bag per
//! object, and a polled change feed. The concrete transport is an adapter
//! concern.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - [`RemoteObject`] is a port-level DTO, not a domain entity; use cases are
//!   responsible for mapping it to [`Item`](crate::domain::Item) values.
//! - Every call takes the [`Credential`] explicitly; token refresh is the
//!   adapter's responsibility.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{PageToken, RemoteId};

/// Application property bag attached to a remote object
pub type Properties = BTreeMap<String, String>;

/// Keys of the application property bag
pub mod property {
    /// Local item id of a file or folder
    pub const ID: &str = "id";
    /// Root folder of the workspace the object belongs to
    pub const FOLDER_ID: &str = "folderId";
    /// Data folder, stored on the root folder
    pub const DATA_FOLDER_ID: &str = "dataFolderId";
    /// Trash folder, stored on the root folder
    pub const TRASH_FOLDER_ID: &str = "trashFolderId";
}

// ============================================================================
// Credential
// ============================================================================

/// Access credential for the remote provider
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Owning principal
    pub sub: String,
    /// Bearer token handed to the transport
    pub access_token: String,
    /// The credential was granted for drive storage
    pub is_drive: bool,
    /// The credential can read and write every file of the drive
    pub drive_full_access: bool,
}

impl Credential {
    /// Returns true if the credential can host a workspace
    pub fn can_host_workspace(&self) -> bool {
        self.is_drive && self.drive_full_access
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("sub", &self.sub)
            .field("access_token", &"<redacted>")
            .field("is_drive", &self.is_drive)
            .field("drive_full_access", &self.drive_full_access)
            .finish()
    }
}

// ============================================================================
// RemoteObject
// ============================================================================

/// Metadata of an object in remote storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Provider-assigned id
    pub id: RemoteId,
    /// Object name
    pub name: String,
    /// Parent folders, in provider order
    #[serde(default)]
    pub parents: Vec<RemoteId>,
    /// Application property bag
    #[serde(default)]
    pub properties: Properties,
    /// Provider mime type
    pub mime_type: String,
}

impl RemoteObject {
    /// Returns the value of an application property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns the first parent, if any
    pub fn first_parent(&self) -> Option<&RemoteId> {
        self.parents.first()
    }

    /// Returns true if `id` is among the parents
    pub fn has_parent(&self, id: &RemoteId) -> bool {
        self.parents.iter().any(|parent| parent == id)
    }
}

// ============================================================================
// UploadRequest
// ============================================================================

/// Create-or-update request for a remote object
///
/// With `existing_id` set, only the provided fields are changed; otherwise a
/// new object is created. A request carrying only `media` replaces the body
/// and leaves metadata untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    pub existing_id: Option<RemoteId>,
    pub name: Option<String>,
    pub parents: Option<Vec<RemoteId>>,
    pub properties: Option<Properties>,
    pub media: Option<String>,
    pub mime_type: Option<String>,
}

impl UploadRequest {
    /// Request creating a new object
    pub fn create() -> Self {
        Self::default()
    }

    /// Request updating the object `id`
    pub fn update(id: RemoteId) -> Self {
        Self {
            existing_id: Some(id),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parents(mut self, parents: Vec<RemoteId>) -> Self {
        self.parents = Some(parents);
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Returns true if the request changes no metadata
    pub fn is_media_only(&self) -> bool {
        self.name.is_none()
            && self.parents.is_none()
            && self.properties.is_none()
            && self.mime_type.is_none()
    }
}

// ============================================================================
// Change feed
// ============================================================================

/// One entry of the remote change feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFeedEntry {
    /// The object the entry concerns
    pub file_id: RemoteId,
    /// Current metadata, or `None` if the object was removed
    pub file: Option<RemoteObject>,
}

/// A fully drained run of the change feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFeedPage {
    /// Entries in feed order
    pub entries: Vec<ChangeFeedEntry>,
    /// Token to resume from on the next poll
    pub next_page_token: PageToken,
}

// ============================================================================
// Revisions
// ============================================================================

/// A historical version of a remote object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Provider revision id
    pub id: String,
    /// Principal of the last user who modified this revision
    pub principal: Option<String>,
    /// When the revision was recorded
    pub modified: DateTime<Utc>,
}

// ============================================================================
// IRemoteStorage trait
// ============================================================================

/// Port trait for remote object storage
///
/// ## Implementation Notes
///
/// - Implementations must not retry internally; transport failures are
///   surfaced to the caller, which owns retry and backoff.
/// - `get_changes` drains every page of the feed since `token` and returns
///   the token to resume from. With no token it starts from the provider's
///   current position.
#[async_trait::async_trait]
pub trait IRemoteStorage: Send + Sync {
    /// Creates a new object or updates an existing one
    ///
    /// # Returns
    /// The object's metadata after the write
    async fn create_or_update(
        &self,
        credential: &Credential,
        request: &UploadRequest,
    ) -> anyhow::Result<RemoteObject>;

    /// Fetches the metadata of an object
    async fn get_object(&self, credential: &Credential, id: &RemoteId)
        -> anyhow::Result<RemoteObject>;

    /// Deletes an object
    async fn delete_object(&self, credential: &Credential, id: &RemoteId) -> anyhow::Result<()>;

    /// Downloads the body of an object
    async fn download(&self, credential: &Credential, id: &RemoteId) -> anyhow::Result<Vec<u8>>;

    /// Reads the change feed from `token`
    async fn get_changes(
        &self,
        credential: &Credential,
        token: Option<&PageToken>,
        include_removed: bool,
    ) -> anyhow::Result<ChangeFeedPage>;

    /// Lists the revisions of an object, oldest first
    async fn list_revisions(
        &self,
        credential: &Credential,
        id: &RemoteId,
    ) -> anyhow::Result<Vec<Revision>>;

    /// Downloads the body of one revision
    async fn download_revision(
        &self,
        credential: &Credential,
        id: &RemoteId,
        revision_id: &str,
    ) -> anyhow::Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str) -> RemoteId {
        RemoteId::new(id.to_string()).unwrap()
    }

    #[test]
    fn test_credential_capability() {
        let mut credential = Credential {
            sub: "user".to_string(),
            access_token: "secret".to_string(),
            is_drive: true,
            drive_full_access: true,
        };
        assert!(credential.can_host_workspace());
        credential.drive_full_access = false;
        assert!(!credential.can_host_workspace());
        assert!(!format!("{credential:?}").contains("secret"));
    }

    #[test]
    fn test_upload_request_builder() {
        let request = UploadRequest::update(remote("r1")).with_media("body");
        assert!(request.is_media_only());
        assert_eq!(request.existing_id, Some(remote("r1")));

        let request = UploadRequest::create()
            .with_name("note.md")
            .with_parents(vec![remote("F1")]);
        assert!(!request.is_media_only());
        assert!(request.existing_id.is_none());
    }

    #[test]
    fn test_remote_object_helpers() {
        let object = RemoteObject {
            id: remote("r1"),
            name: "note.md".to_string(),
            parents: vec![remote("P1"), remote("P2")],
            properties: Properties::from([("id".to_string(), "a1".to_string())]),
            mime_type: "text/markdown".to_string(),
        };
        assert_eq!(object.property("id"), Some("a1"));
        assert_eq!(object.property("folderId"), None);
        assert_eq!(object.first_parent(), Some(&remote("P1")));
        assert!(object.has_parent(&remote("P2")));
    }
}
