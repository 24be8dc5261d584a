//! In-memory port implementations shared by the use case tests

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use anyhow::anyhow;

use crate::domain::{
    PageToken, RemoteId, SyncData, SyncDataPatch, SyncLocation, Workspace, WorkspaceId,
};
use crate::ports::{
    ChangeFeedEntry, ChangeFeedPage, Credential, IRemoteStorage, ISyncDataStore,
    IStateRepository, RemoteObject, Revision, UploadRequest,
};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

pub fn rid(id: &str) -> RemoteId {
    RemoteId::new(id.to_string()).unwrap()
}

pub fn credential() -> Credential {
    Credential {
        sub: "user-1".to_string(),
        access_token: "token".to_string(),
        is_drive: true,
        drive_full_access: true,
    }
}

pub fn workspace() -> Workspace {
    Workspace {
        id: Workspace::make_id("googleDriveWorkspace", &rid("F")),
        sub: "user-1".to_string(),
        name: "Notes".to_string(),
        provider_id: "googleDriveWorkspace".to_string(),
        url: "https://localhost/app#providerId=googleDriveWorkspace&folderId=F".to_string(),
        folder_id: rid("F"),
        data_folder_id: rid("D"),
        trash_folder_id: rid("T"),
    }
}

#[derive(Default)]
struct RemoteState {
    objects: BTreeMap<String, RemoteObject>,
    bodies: HashMap<String, String>,
    feed: Vec<ChangeFeedEntry>,
    revisions: HashMap<String, Vec<(Revision, String)>>,
    calls: Vec<String>,
    next_id: usize,
    next_token: usize,
}

/// Remote storage kept in memory, recording every call
#[derive(Default)]
pub struct MockRemote {
    state: Mutex<RemoteState>,
}

impl MockRemote {
    pub fn insert(&self, object: RemoteObject, body: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        if let Some(body) = body {
            state.bodies.insert(object.id.to_string(), body.to_string());
        }
        state.objects.insert(object.id.to_string(), object);
    }

    pub fn object(&self, id: &str) -> Option<RemoteObject> {
        self.state.lock().unwrap().objects.get(id).cloned()
    }

    pub fn body(&self, id: &str) -> Option<String> {
        self.state.lock().unwrap().bodies.get(id).cloned()
    }

    pub fn set_feed(&self, entries: Vec<ChangeFeedEntry>) {
        self.state.lock().unwrap().feed = entries;
    }

    pub fn add_revision(&self, id: &str, revision: Revision, body: &str) {
        self.state
            .lock()
            .unwrap()
            .revisions
            .entry(id.to_string())
            .or_default()
            .push((revision, body.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of create, update and delete calls
    pub fn writes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| {
                c.starts_with("create") || c.starts_with("update") || c.starts_with("delete")
            })
            .count()
    }
}

#[async_trait::async_trait]
impl IRemoteStorage for MockRemote {
    async fn create_or_update(
        &self,
        _credential: &Credential,
        request: &UploadRequest,
    ) -> anyhow::Result<RemoteObject> {
        let mut state = self.state.lock().unwrap();
        let mut object = match &request.existing_id {
            Some(id) => {
                state.calls.push(format!("update:{id}"));
                state
                    .objects
                    .get(id.as_str())
                    .cloned()
                    .ok_or_else(|| anyhow!("404 {id}"))?
            }
            None => {
                state.next_id += 1;
                let id = format!("r{}", state.next_id);
                state.calls.push(format!("create:{id}"));
                RemoteObject {
                    id: rid(&id),
                    name: String::new(),
                    parents: Vec::new(),
                    properties: BTreeMap::new(),
                    mime_type: "text/plain".to_string(),
                }
            }
        };
        if let Some(name) = &request.name {
            object.name = name.clone();
        }
        if let Some(parents) = &request.parents {
            object.parents = parents.clone();
        }
        if let Some(properties) = &request.properties {
            object.properties.extend(properties.clone());
        }
        if let Some(mime_type) = &request.mime_type {
            object.mime_type = mime_type.clone();
        }
        if let Some(media) = &request.media {
            state.bodies.insert(object.id.to_string(), media.clone());
        }
        state.objects.insert(object.id.to_string(), object.clone());
        Ok(object)
    }

    async fn get_object(
        &self,
        _credential: &Credential,
        id: &RemoteId,
    ) -> anyhow::Result<RemoteObject> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get:{id}"));
        state
            .objects
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("404 {id}"))
    }

    async fn delete_object(&self, _credential: &Credential, id: &RemoteId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete:{id}"));
        state.objects.remove(id.as_str());
        state.bodies.remove(id.as_str());
        Ok(())
    }

    async fn download(&self, _credential: &Credential, id: &RemoteId) -> anyhow::Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("download:{id}"));
        state
            .bodies
            .get(id.as_str())
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| anyhow!("404 {id}"))
    }

    async fn get_changes(
        &self,
        _credential: &Credential,
        _token: Option<&PageToken>,
        _include_removed: bool,
    ) -> anyhow::Result<ChangeFeedPage> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("changes".to_string());
        state.next_token += 1;
        Ok(ChangeFeedPage {
            entries: state.feed.clone(),
            next_page_token: PageToken::new(format!("t{}", state.next_token))?,
        })
    }

    async fn list_revisions(
        &self,
        _credential: &Credential,
        id: &RemoteId,
    ) -> anyhow::Result<Vec<Revision>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .revisions
            .get(id.as_str())
            .map(|revisions| revisions.iter().map(|(r, _)| r.clone()).collect())
            .unwrap_or_default())
    }

    async fn download_revision(
        &self,
        _credential: &Credential,
        id: &RemoteId,
        revision_id: &str,
    ) -> anyhow::Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .revisions
            .get(id.as_str())
            .and_then(|revisions| revisions.iter().find(|(r, _)| r.id == revision_id))
            .map(|(_, body)| body.clone().into_bytes())
            .ok_or_else(|| anyhow!("404 revision {revision_id}"))
    }
}

/// Sync-data ledger kept in memory
#[derive(Default)]
pub struct MockSyncDataStore {
    entries: Mutex<BTreeMap<String, SyncData>>,
}

impl MockSyncDataStore {
    pub fn with(entries: Vec<SyncData>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().map(|e| (e.id.clone(), e)).collect()),
        }
    }

    pub fn snapshot(&self) -> Vec<SyncData> {
        self.entries.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl ISyncDataStore for MockSyncDataStore {
    async fn get(&self, id: &str) -> anyhow::Result<Option<SyncData>> {
        Ok(self.entries.lock().unwrap().get(id).cloned())
    }

    async fn get_by_item_id(&self, item_id: &str) -> anyhow::Result<Option<SyncData>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .find(|e| e.item_id == item_id)
            .cloned())
    }

    async fn all(&self) -> anyhow::Result<Vec<SyncData>> {
        Ok(self.snapshot())
    }

    async fn patch(&self, id: &str, patch: SyncDataPatch) -> anyhow::Result<SyncData> {
        let mut entries = self.entries.lock().unwrap();
        let merged = patch.apply(id, entries.get(id))?;
        entries.insert(id.to_string(), merged.clone());
        Ok(merged)
    }

    async fn remove(&self, id: &str) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
struct RepositoryState {
    workspaces: HashMap<String, Workspace>,
    tokens: HashMap<String, PageToken>,
    location: Option<SyncLocation>,
    location_writes: usize,
}

/// Workspace state kept in memory
#[derive(Default)]
pub struct MockStateRepository {
    state: Mutex<RepositoryState>,
}

impl MockStateRepository {
    pub fn location_writes(&self) -> usize {
        self.state.lock().unwrap().location_writes
    }
}

#[async_trait::async_trait]
impl IStateRepository for MockStateRepository {
    async fn get_workspace(&self, id: &WorkspaceId) -> anyhow::Result<Option<Workspace>> {
        Ok(self.state.lock().unwrap().workspaces.get(id.as_str()).cloned())
    }

    async fn save_workspace(&self, workspace: &Workspace) -> anyhow::Result<()> {
        self.state
            .lock()
            .unwrap()
            .workspaces
            .insert(workspace.id.to_string(), workspace.clone());
        Ok(())
    }

    async fn get_page_token(
        &self,
        workspace_id: &WorkspaceId,
    ) -> anyhow::Result<Option<PageToken>> {
        Ok(self.state.lock().unwrap().tokens.get(workspace_id.as_str()).cloned())
    }

    async fn save_page_token(
        &self,
        workspace_id: &WorkspaceId,
        token: &PageToken,
    ) -> anyhow::Result<()> {
        self.state
            .lock()
            .unwrap()
            .tokens
            .insert(workspace_id.to_string(), token.clone());
        Ok(())
    }

    async fn get_location(&self) -> anyhow::Result<Option<SyncLocation>> {
        Ok(self.state.lock().unwrap().location.clone())
    }

    async fn save_location(&self, location: &SyncLocation) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.location = Some(location.clone());
        state.location_writes += 1;
        Ok(())
    }
}
