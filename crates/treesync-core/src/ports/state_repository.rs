//! Local state port
//!
//! Keeps the workspace records, one change-feed page token per workspace and
//! the location of the open workspace. Errors are adapter specific and
//! surface as `anyhow::Error`.

use crate::domain::{PageToken, SyncLocation, Workspace, WorkspaceId};

/// Port trait for workspace and feed-position persistence
#[async_trait::async_trait]
pub trait IStateRepository: Send + Sync {
    /// Loads a workspace record
    async fn get_workspace(&self, id: &WorkspaceId) -> anyhow::Result<Option<Workspace>>;

    /// Inserts or replaces a workspace record
    async fn save_workspace(&self, workspace: &Workspace) -> anyhow::Result<()>;

    /// Loads the page token to resume the change feed from
    async fn get_page_token(&self, workspace_id: &WorkspaceId)
        -> anyhow::Result<Option<PageToken>>;

    /// Stores the page token to resume the change feed from
    async fn save_page_token(
        &self,
        workspace_id: &WorkspaceId,
        token: &PageToken,
    ) -> anyhow::Result<()>;

    /// Loads the current navigable location
    async fn get_location(&self) -> anyhow::Result<Option<SyncLocation>>;

    /// Stores the current navigable location
    async fn save_location(&self, location: &SyncLocation) -> anyhow::Result<()>;
}
