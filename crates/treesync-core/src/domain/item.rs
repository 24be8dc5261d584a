//! Local items
//!
//! An [`Item`] is an entity of the local document tree. Items are owned by
//! the document-tree collaborator; this crate only reads them, derives them
//! from remote objects, and hashes them.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::DomainError;
use super::hashing::hash_without_hash_field;

/// Parent id sentinel designating the provider's trash folder
pub const TRASH_ID: &str = "trash";

/// Kind of a local item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// A document; its body lives in a synthetic `content` child
    File,
    /// A folder of the document tree
    Folder,
    /// An opaque metadata item stored as JSON in the data folder
    Data,
    /// The body of a file, keyed `<fileId>/content`
    Content,
}

impl ItemType {
    /// Returns the lowercase wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::File => "file",
            ItemType::Folder => "folder",
            ItemType::Data => "data",
            ItemType::Content => "content",
        }
    }

    /// Returns true for types stored as named objects in the folder tree
    pub fn is_tree_item(&self) -> bool {
        matches!(self, ItemType::File | ItemType::Folder)
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(ItemType::File),
            "folder" => Ok(ItemType::Folder),
            "data" => Ok(ItemType::Data),
            "content" => Ok(ItemType::Content),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown item type: {other}"
            ))),
        }
    }
}

/// A local entity of the document tree
///
/// `name` and `parent_id` are only meaningful for files and folders. A
/// `parent_id` of `None` means the workspace root; [`TRASH_ID`] means trash.
/// Any extra fields of data items are kept in `data` and take part in the hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Stable, provider-independent id
    pub id: String,
    /// Item kind
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Id of the parent item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Hash of the canonical form of the item
    #[serde(default)]
    pub hash: i64,
    /// Payload fields of data items
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Item {
    /// Creates a file item (hash not yet computed)
    pub fn file(id: impl Into<String>, name: impl Into<String>, parent_id: Option<String>) -> Self {
        Self::tree_item(ItemType::File, id.into(), name.into(), parent_id)
    }

    /// Creates a folder item (hash not yet computed)
    pub fn folder(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: Option<String>,
    ) -> Self {
        Self::tree_item(ItemType::Folder, id.into(), name.into(), parent_id)
    }

    /// Creates a data item carrying the given payload fields
    pub fn data(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            item_type: ItemType::Data,
            name: None,
            parent_id: None,
            hash: 0,
            data,
        }
    }

    fn tree_item(item_type: ItemType, id: String, name: String, parent_id: Option<String>) -> Self {
        Self {
            id,
            item_type,
            name: Some(name),
            parent_id,
            hash: 0,
            data: Map::new(),
        }
    }

    /// Sets an explicit hash
    #[must_use]
    pub fn with_hash(mut self, hash: i64) -> Self {
        self.hash = hash;
        self
    }

    /// Computes the hash of the item's canonical form (excluding `hash`)
    ///
    /// # Errors
    /// Returns error if a payload field cannot be represented as JSON
    pub fn compute_hash(&self) -> Result<i64, DomainError> {
        hash_without_hash_field(self)
    }

    /// Returns the item with its hash set to [`compute_hash`](Self::compute_hash)
    ///
    /// # Errors
    /// Returns error if a payload field cannot be represented as JSON
    pub fn with_computed_hash(mut self) -> Result<Self, DomainError> {
        self.hash = self.compute_hash()?;
        Ok(self)
    }

    /// Returns true if the item sits in the trash
    pub fn is_in_trash(&self) -> bool {
        self.parent_id.as_deref() == Some(TRASH_ID)
    }

    /// Parses an item from its JSON representation
    ///
    /// # Errors
    /// Returns [`DomainError::MalformedPayload`] if the JSON is invalid or
    /// lacks `id`/`type`
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        serde_json::from_str(json)
            .map_err(|e| DomainError::MalformedPayload(format!("Invalid item JSON: {e}")))
    }

    /// Serializes the full item to JSON
    ///
    /// # Errors
    /// Returns error if a payload field cannot be represented as JSON
    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string(self)
            .map_err(|e| DomainError::MalformedPayload(format!("Cannot serialize item: {e}")))
    }

    /// JSON of `{id, type, hash}`, used as the remote name of data items
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn summary_json(&self) -> Result<String, DomainError> {
        let summary = serde_json::json!({
            "id": self.id,
            "type": self.item_type,
            "hash": self.hash,
        });
        serde_json::to_string(&summary)
            .map_err(|e| DomainError::MalformedPayload(format!("Cannot serialize summary: {e}")))
    }
}
