//! Integration tests for SqliteStateRepository
//!
//! These tests exercise both port implementations against an in-memory
//! SQLite database. Each test function creates a fresh database to ensure
//! test isolation.

use treesync_cache::{DatabasePool, SqliteStateRepository};
use treesync_core::domain::{
    ItemType, PageToken, RemoteId, SyncData, SyncDataPatch, SyncLocation, Workspace,
};
use treesync_core::ports::{IStateRepository, ISyncDataStore};

// ============================================================================
// Test helpers
// ============================================================================

/// Create a fresh in-memory repository for each test
async fn setup() -> SqliteStateRepository {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteStateRepository::new(pool.pool().clone())
}

fn rid(id: &str) -> RemoteId {
    RemoteId::new(id.to_string()).unwrap()
}

fn test_workspace() -> Workspace {
    Workspace {
        id: Workspace::make_id("googleDriveWorkspace", &rid("F1")),
        sub: "user-1".to_string(),
        name: "Notes".to_string(),
        provider_id: "googleDriveWorkspace".to_string(),
        url: "https://localhost/app#providerId=googleDriveWorkspace&folderId=F1".to_string(),
        folder_id: rid("F1"),
        data_folder_id: rid("D1"),
        trash_folder_id: rid("T1"),
    }
}

// ============================================================================
// Sync data
// ============================================================================

#[tokio::test]
async fn test_patch_creates_and_merges() {
    let repo = setup().await;

    let created = repo
        .patch("r1", SyncDataPatch::full("a1", ItemType::File, 42))
        .await
        .unwrap();
    assert_eq!(created, SyncData::new("r1", "a1", ItemType::File, 42));

    let merged = repo.patch("r1", SyncDataPatch::hash(43)).await.unwrap();
    assert_eq!(merged, SyncData::new("r1", "a1", ItemType::File, 43));
    assert_eq!(repo.get("r1").await.unwrap(), Some(merged));
}

#[tokio::test]
async fn test_patch_without_identity_fails_on_create() {
    let repo = setup().await;
    assert!(repo.patch("r1", SyncDataPatch::hash(1)).await.is_err());
    assert!(repo.get("r1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_lookup_by_item_id() {
    let repo = setup().await;
    repo.patch("r1", SyncDataPatch::full("a1", ItemType::File, 1))
        .await
        .unwrap();
    repo.patch(
        "r1/content",
        SyncDataPatch::full("a1/content", ItemType::Content, 1),
    )
    .await
    .unwrap();

    let content = repo.get_by_item_id("a1/content").await.unwrap().unwrap();
    assert_eq!(content.id, "r1/content");
    assert!(content.is_content());
    assert_eq!(repo.get_by_item_id("a1").await.unwrap().unwrap().id, "r1");
    assert!(repo.get_by_item_id("zz").await.unwrap().is_none());
}

#[tokio::test]
async fn test_item_lookup_prefers_latest_patch() {
    let repo = setup().await;
    for id in ["r2", "r1"] {
        repo.patch(id, SyncDataPatch::full("a1", ItemType::File, 1))
            .await
            .unwrap();
    }
    assert_eq!(repo.get_by_item_id("a1").await.unwrap().unwrap().id, "r1");

    repo.patch("r2", SyncDataPatch::hash(2)).await.unwrap();
    let latest = repo.get_by_item_id("a1").await.unwrap().unwrap();
    assert_eq!(latest, SyncData::new("r2", "a1", ItemType::File, 2));
}

#[tokio::test]
async fn test_all_and_remove() {
    let repo = setup().await;
    for (id, item) in [("r2", "b"), ("r1", "a"), ("r3", "c")] {
        repo.patch(id, SyncDataPatch::full(item, ItemType::Folder, 0))
            .await
            .unwrap();
    }

    let ids: Vec<String> = repo.all().await.unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["r1", "r2", "r3"]);

    repo.remove("r2").await.unwrap();
    repo.remove("missing").await.unwrap();
    assert_eq!(repo.all().await.unwrap().len(), 2);
    assert!(repo.get("r2").await.unwrap().is_none());
}

// ============================================================================
// Workspace state
// ============================================================================

#[tokio::test]
async fn test_workspace_roundtrip() {
    let repo = setup().await;
    let workspace = test_workspace();

    assert!(repo.get_workspace(&workspace.id).await.unwrap().is_none());
    repo.save_workspace(&workspace).await.unwrap();
    assert_eq!(
        repo.get_workspace(&workspace.id).await.unwrap(),
        Some(workspace.clone())
    );

    let mut renamed = workspace.clone();
    renamed.name = "Renamed".to_string();
    repo.save_workspace(&renamed).await.unwrap();
    assert_eq!(
        repo.get_workspace(&workspace.id).await.unwrap().unwrap().name,
        "Renamed"
    );
}

#[tokio::test]
async fn test_page_token_per_workspace() {
    let repo = setup().await;
    let workspace = test_workspace();
    let other = Workspace::make_id("googleDriveWorkspace", &rid("F2"));

    assert!(repo.get_page_token(&workspace.id).await.unwrap().is_none());
    repo.save_page_token(&workspace.id, &PageToken::new("100".to_string()).unwrap())
        .await
        .unwrap();
    repo.save_page_token(&workspace.id, &PageToken::new("101".to_string()).unwrap())
        .await
        .unwrap();

    assert_eq!(
        repo.get_page_token(&workspace.id).await.unwrap().unwrap().as_str(),
        "101"
    );
    assert!(repo.get_page_token(&other).await.unwrap().is_none());
}

#[tokio::test]
async fn test_location_roundtrip() {
    let repo = setup().await;
    assert!(repo.get_location().await.unwrap().is_none());

    let location = SyncLocation::new("googleDriveWorkspace", rid("F1"));
    repo.save_location(&location).await.unwrap();
    assert_eq!(repo.get_location().await.unwrap(), Some(location));
}

#[tokio::test]
async fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("treesync.db");

    {
        let pool = DatabasePool::new(&path).await.unwrap();
        let repo = SqliteStateRepository::new(pool.pool().clone());
        repo.patch("r1", SyncDataPatch::full("a1", ItemType::File, 9))
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = DatabasePool::new(&path).await.unwrap();
    let repo = SqliteStateRepository::new(pool.pool().clone());
    assert_eq!(repo.get("r1").await.unwrap().unwrap().hash, 9);
}
