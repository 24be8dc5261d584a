//! Classified change-feed entries

use serde::{Deserialize, Serialize};

use super::item::{Item, ItemType};
use super::newtypes::PageToken;
use super::sync_data::SyncData;

/// What happened to the remote object behind a [`Change`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeKind {
    /// The object exists; carries the derived item and the ledger projection
    /// the caller should persist
    Upsert { item: Item, sync_data: SyncData },
    /// The object was removed or trashed remotely
    Removal,
}

/// One classified feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Remote object id, or `<fileId>/content` for synthetic content changes
    pub sync_data_id: String,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl Change {
    pub fn upsert(item: Item, sync_data: SyncData) -> Self {
        Self {
            sync_data_id: sync_data.id.clone(),
            kind: ChangeKind::Upsert { item, sync_data },
        }
    }

    pub fn removal(sync_data_id: impl Into<String>) -> Self {
        Self {
            sync_data_id: sync_data_id.into(),
            kind: ChangeKind::Removal,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self.kind, ChangeKind::Removal)
    }

    /// The derived item, for upserts
    pub fn item(&self) -> Option<&Item> {
        match &self.kind {
            ChangeKind::Upsert { item, .. } => Some(item),
            ChangeKind::Removal => None,
        }
    }

    /// The ledger projection, for upserts
    pub fn sync_data(&self) -> Option<&SyncData> {
        match &self.kind {
            ChangeKind::Upsert { sync_data, .. } => Some(sync_data),
            ChangeKind::Removal => None,
        }
    }

    /// Type of the derived item, for upserts
    pub fn item_type(&self) -> Option<ItemType> {
        self.item().map(|item| item.item_type)
    }
}

/// Changes read from the feed, with the token to resume from once they are
/// applied
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeBatch {
    pub changes: Vec<Change>,
    pub next_page_token: PageToken,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}
