//! Sync-data ledger entries
//!
//! A [`SyncData`] record maps a remote object id (or the derived
//! `<fileId>/content` key) to the local item it mirrors, and remembers the
//! hash of the item last seen on or sent to the remote.

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::item::ItemType;

/// Hash recorded for synthetic content entries derived from the change feed
///
/// The feed does not carry a content hash, so this placeholder is replaced
/// by the real hash on the first content download.
pub const CONTENT_SENTINEL_HASH: i64 = 1;

/// Returns the derived key of the content of file `id`
///
/// Applied to a remote id it gives the ledger key of the content entry;
/// applied to a local item id it gives the content item id.
pub fn content_key(id: &str) -> String {
    format!("{id}/content")
}

/// Mapping between a remote object and a local item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncData {
    /// Remote object id, or `<fileId>/content`
    pub id: String,
    /// Id of the mirrored local item
    pub item_id: String,
    /// Type of the mirrored local item
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Hash of the item as last synchronized
    pub hash: i64,
}

impl SyncData {
    /// Creates a new ledger entry
    pub fn new(
        id: impl Into<String>,
        item_id: impl Into<String>,
        item_type: ItemType,
        hash: i64,
    ) -> Self {
        Self {
            id: id.into(),
            item_id: item_id.into(),
            item_type,
            hash,
        }
    }

    /// Returns true if this entry maps the body of a file
    pub fn is_content(&self) -> bool {
        self.item_type == ItemType::Content
    }
}

/// Partial update of a ledger entry
///
/// Fields left as `None` keep their stored value. Creating a new entry
/// requires both `item_id` and `item_type`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDataPatch {
    pub item_id: Option<String>,
    pub item_type: Option<ItemType>,
    pub hash: Option<i64>,
}

impl SyncDataPatch {
    /// Patch that only refreshes the hash
    pub fn hash(hash: i64) -> Self {
        Self {
            hash: Some(hash),
            ..Self::default()
        }
    }

    /// Patch that sets every field
    pub fn full(item_id: impl Into<String>, item_type: ItemType, hash: i64) -> Self {
        Self {
            item_id: Some(item_id.into()),
            item_type: Some(item_type),
            hash: Some(hash),
        }
    }

    /// Merges the patch onto `existing`, or creates the entry `id` from it
    ///
    /// # Errors
    /// Returns error when creating an entry without `item_id` or `item_type`
    pub fn apply(&self, id: &str, existing: Option<&SyncData>) -> Result<SyncData, DomainError> {
        match existing {
            Some(current) => Ok(SyncData {
                id: current.id.clone(),
                item_id: self
                    .item_id
                    .clone()
                    .unwrap_or_else(|| current.item_id.clone()),
                item_type: self.item_type.unwrap_or(current.item_type),
                hash: self.hash.unwrap_or(current.hash),
            }),
            None => {
                let (Some(item_id), Some(item_type)) = (self.item_id.clone(), self.item_type)
                else {
                    return Err(DomainError::ValidationFailed(format!(
                        "Cannot create sync data {id} without item id and type"
                    )));
                };
                Ok(SyncData {
                    id: id.to_string(),
                    item_id,
                    item_type,
                    hash: self.hash.unwrap_or_default(),
                })
            }
        }
    }
}

impl From<&SyncData> for SyncDataPatch {
    fn from(data: &SyncData) -> Self {
        Self::full(data.item_id.clone(), data.item_type, data.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key() {
        assert_eq!(content_key("r1"), "r1/content");
    }

    #[test]
    fn test_patch_merges_hash_only() {
        let existing = SyncData::new("r1", "a1", ItemType::File, 10);
        let merged = SyncDataPatch::hash(42).apply("r1", Some(&existing)).unwrap();
        assert_eq!(merged, SyncData::new("r1", "a1", ItemType::File, 42));
    }

    #[test]
    fn test_patch_creates_entry() {
        let created = SyncDataPatch::full("a1", ItemType::Folder, 3)
            .apply("r2", None)
            .unwrap();
        assert_eq!(created.id, "r2");
        assert_eq!(created.item_type, ItemType::Folder);
    }

    #[test]
    fn test_patch_create_requires_identity() {
        let result = SyncDataPatch::hash(1).apply("r3", None);
        assert!(matches!(result, Err(DomainError::ValidationFailed(_))));
    }

    #[test]
    fn test_serde_shape() {
        let data = SyncData::new("r1/content", "a1/content", ItemType::Content, 1);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["itemId"], "a1/content");
        assert_eq!(json["type"], "content");
        assert!(data.is_content());
    }
}
