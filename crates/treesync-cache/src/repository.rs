//! SQLite implementation of ISyncDataStore and IStateRepository
//!
//! This module provides the concrete SQLite-based implementation of the
//! state ports defined in treesync-core. It handles all domain type
//! serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type          | SQL Type | Strategy                                  |
//! |----------------------|----------|-------------------------------------------|
//! | RemoteId, PageToken  | TEXT     | `.as_str()` / `::new()`                   |
//! | WorkspaceId          | TEXT     | `.as_str()` / `WorkspaceId::new()`        |
//! | ItemType             | TEXT     | `.as_str()` / `FromStr`                   |
//! | hash                 | INTEGER  | `i64`                                     |
//! | SyncLocation         | TEXT     | serde_json in the `settings` table        |
//! | updated_at           | TEXT     | ISO 8601 via `to_rfc3339()`               |
//! | patch_seq            | INTEGER  | bumped on every patch, newest wins        |

use std::str::FromStr;

use anyhow::Context;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use treesync_core::domain::{
    ItemType, PageToken, RemoteId, SyncData, SyncDataPatch, SyncLocation, Workspace, WorkspaceId,
};
use treesync_core::ports::{IStateRepository, ISyncDataStore};

use crate::CacheError;

const LOCATION_KEY: &str = "location";

/// SQLite-based implementation of the state ports
///
/// Provides persistent storage for the sync-data ledger and workspace state.
/// All operations are performed through a connection pool for concurrency.
pub struct SqliteStateRepository {
    pool: SqlitePool,
}

impl SqliteStateRepository {
    /// Creates a new repository instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Row conversion
// ============================================================================

fn sync_data_from_row(row: &SqliteRow) -> Result<SyncData, CacheError> {
    let item_type: String = row.try_get("item_type")?;
    let item_type = ItemType::from_str(&item_type)
        .map_err(|e| CacheError::Corrupt(e.to_string()))?;

    Ok(SyncData {
        id: row.try_get("id")?,
        item_id: row.try_get("item_id")?,
        item_type,
        hash: row.try_get("hash")?,
    })
}

fn remote_id_column(row: &SqliteRow, column: &str) -> Result<RemoteId, CacheError> {
    let value: String = row.try_get(column)?;
    RemoteId::new(value).map_err(|e| CacheError::Corrupt(e.to_string()))
}

fn workspace_from_row(row: &SqliteRow) -> Result<Workspace, CacheError> {
    let id: String = row.try_get("id")?;
    let id = WorkspaceId::new(id).map_err(|e| CacheError::Corrupt(e.to_string()))?;

    Ok(Workspace {
        id,
        sub: row.try_get("sub")?,
        name: row.try_get("name")?,
        provider_id: row.try_get("provider_id")?,
        url: row.try_get("url")?,
        folder_id: remote_id_column(row, "folder_id")?,
        data_folder_id: remote_id_column(row, "data_folder_id")?,
        trash_folder_id: remote_id_column(row, "trash_folder_id")?,
    })
}

// ============================================================================
// ISyncDataStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ISyncDataStore for SqliteStateRepository {
    async fn get(&self, id: &str) -> anyhow::Result<Option<SyncData>> {
        let row = sqlx::query("SELECT id, item_id, item_type, hash FROM sync_data WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(sync_data_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn get_by_item_id(&self, item_id: &str) -> anyhow::Result<Option<SyncData>> {
        let row = sqlx::query(
            "SELECT id, item_id, item_type, hash FROM sync_data \
             WHERE item_id = ? ORDER BY patch_seq DESC LIMIT 1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(sync_data_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn all(&self) -> anyhow::Result<Vec<SyncData>> {
        let rows = sqlx::query("SELECT id, item_id, item_type, hash FROM sync_data ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| sync_data_from_row(r).map_err(Into::into))
            .collect()
    }

    async fn patch(&self, id: &str, patch: SyncDataPatch) -> anyhow::Result<SyncData> {
        // Single statement: the merge happens inside SQLite, so concurrent
        // patches of different fields cannot overwrite each other.
        let row = sqlx::query(
            "INSERT INTO sync_data (id, item_id, item_type, hash, patch_seq, updated_at) \
             SELECT ?1, \
                    COALESCE(?2, (SELECT item_id FROM sync_data WHERE id = ?1)), \
                    COALESCE(?3, (SELECT item_type FROM sync_data WHERE id = ?1)), \
                    COALESCE(?4, (SELECT hash FROM sync_data WHERE id = ?1), 0), \
                    (SELECT COALESCE(MAX(patch_seq), 0) + 1 FROM sync_data), \
                    ?5 \
             WHERE true \
             ON CONFLICT (id) DO UPDATE SET \
                 item_id = excluded.item_id, \
                 item_type = excluded.item_type, \
                 hash = excluded.hash, \
                 patch_seq = excluded.patch_seq, \
                 updated_at = excluded.updated_at \
             RETURNING id, item_id, item_type, hash",
        )
        .bind(id)
        .bind(patch.item_id.as_deref())
        .bind(patch.item_type.map(|t| t.as_str()))
        .bind(patch.hash)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to patch sync data {id}"))?;

        let data = sync_data_from_row(&row)?;
        tracing::trace!(sync_data_id = %id, hash = data.hash, "Patched sync data");
        Ok(data)
    }

    async fn remove(&self, id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sync_data WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::trace!(sync_data_id = %id, "Removed sync data");
        Ok(())
    }
}

// ============================================================================
// IStateRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl IStateRepository for SqliteStateRepository {
    // --- Workspace operations ---

    async fn get_workspace(&self, id: &WorkspaceId) -> anyhow::Result<Option<Workspace>> {
        let row = sqlx::query("SELECT * FROM workspaces WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(workspace_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn save_workspace(&self, workspace: &Workspace) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO workspaces \
             (id, sub, name, provider_id, url, folder_id, data_folder_id, \
              trash_folder_id, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(workspace.id.as_str())
        .bind(&workspace.sub)
        .bind(&workspace.name)
        .bind(&workspace.provider_id)
        .bind(&workspace.url)
        .bind(workspace.folder_id.as_str())
        .bind(workspace.data_folder_id.as_str())
        .bind(workspace.trash_folder_id.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::trace!(workspace_id = %workspace.id, "Saved workspace");
        Ok(())
    }

    // --- Change feed position ---

    async fn get_page_token(
        &self,
        workspace_id: &WorkspaceId,
    ) -> anyhow::Result<Option<PageToken>> {
        let token: Option<String> =
            sqlx::query_scalar("SELECT token FROM page_tokens WHERE workspace_id = ?")
                .bind(workspace_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match token {
            Some(t) => Ok(Some(
                PageToken::new(t).map_err(|e| CacheError::Corrupt(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    async fn save_page_token(
        &self,
        workspace_id: &WorkspaceId,
        token: &PageToken,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO page_tokens (workspace_id, token, updated_at) \
             VALUES (?, ?, ?)",
        )
        .bind(workspace_id.as_str())
        .bind(token.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::trace!(workspace_id = %workspace_id, "Saved page token");
        Ok(())
    }

    // --- Location ---

    async fn get_location(&self) -> anyhow::Result<Option<SyncLocation>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(LOCATION_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json).map_err(|e| {
                CacheError::Corrupt(format!("Invalid stored location: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    async fn save_location(&self, location: &SyncLocation) -> anyhow::Result<()> {
        let json = serde_json::to_string(location)
            .map_err(|e| anyhow::anyhow!("Failed to serialize location: {}", e))?;

        sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
            .bind(LOCATION_KEY)
            .bind(&json)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
