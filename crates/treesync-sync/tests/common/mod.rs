//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail};
use chrono::{Duration, TimeZone, Utc};

use treesync_cache::{MemoryStateRepository, MemorySyncDataStore};
use treesync_core::config::{Config, ConfigBuilder};
use treesync_core::domain::{PageToken, RemoteId, SyncData, Workspace};
use treesync_core::ports::{
    ChangeFeedEntry, ChangeFeedPage, Credential, IRemoteStorage, ISyncDataStore, Properties,
    RemoteObject, Revision, UploadRequest,
};
use treesync_sync::SyncEngine;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Error returned by every call while the fake remote is offline
pub const OFFLINE_ERROR: &str = "connection reset by peer";

pub fn rid(id: &str) -> RemoteId {
    RemoteId::new(id.to_string()).unwrap()
}

pub fn credential() -> Credential {
    Credential {
        sub: "user-1".to_string(),
        access_token: "secret".to_string(),
        is_drive: true,
        drive_full_access: true,
    }
}

pub fn config() -> Config {
    ConfigBuilder::new()
        .workspace_app_url("https://notes.example/app")
        .build()
}

// ============================================================================
// FakeRemote
// ============================================================================

#[derive(Default)]
struct RemoteState {
    objects: BTreeMap<String, RemoteObject>,
    bodies: HashMap<String, String>,
    /// Ids of written objects, in write order; page tokens index into it
    feed: Vec<String>,
    revisions: HashMap<String, Vec<(Revision, String)>>,
    calls: Vec<String>,
    next_id: usize,
    offline: bool,
}

impl RemoteState {
    /// Records an attempted call, which fails while offline
    fn record(&mut self, call: String) -> anyhow::Result<()> {
        self.calls.push(call);
        if self.offline {
            bail!("{OFFLINE_ERROR}");
        }
        Ok(())
    }
}

/// Remote storage held in memory
///
/// Every write is appended to the change feed and every body write becomes a
/// revision, so tests observe the engine's own writes the way a provider
/// would report them.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<RemoteState>,
}

impl FakeRemote {
    /// Adds an object without recording a call or a feed entry
    pub fn insert_folder(&self, id: &str, name: &str, properties: &[(&str, &str)]) {
        let object = RemoteObject {
            id: rid(id),
            name: name.to_string(),
            parents: Vec::new(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Properties>(),
            mime_type: FOLDER_MIME.to_string(),
        };
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(id.to_string(), object);
    }

    /// Deletes an object as another client would
    pub fn delete_externally(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.objects.remove(id);
        state.bodies.remove(id);
        state.feed.push(id.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    pub fn object(&self, id: &str) -> Option<RemoteObject> {
        self.state.lock().unwrap().objects.get(id).cloned()
    }

    pub fn body(&self, id: &str) -> Option<String> {
        self.state.lock().unwrap().bodies.get(id).cloned()
    }

    /// Every attempted call, including the ones that failed offline
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
impl IRemoteStorage for FakeRemote {
    async fn create_or_update(
        &self,
        _credential: &Credential,
        request: &UploadRequest,
    ) -> anyhow::Result<RemoteObject> {
        let mut state = self.state.lock().unwrap();
        let mut object = match &request.existing_id {
            Some(id) => {
                state.record(format!("update:{id}"))?;
                state
                    .objects
                    .get(id.as_str())
                    .cloned()
                    .ok_or_else(|| anyhow!("404 {id}"))?
            }
            None => {
                state.next_id += 1;
                let id = format!("r{}", state.next_id);
                state.record(format!("create:{id}"))?;
                RemoteObject {
                    id: rid(&id),
                    name: String::new(),
                    parents: Vec::new(),
                    properties: Properties::new(),
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

        let id = object.id.to_string();
        if let Some(media) = &request.media {
            state.bodies.insert(id.clone(), media.clone());
            let revisions = state.revisions.entry(id.clone()).or_default();
            let n = revisions.len() as i64;
            let revision = Revision {
                id: format!("v{}", n + 1),
                principal: Some("user-1".to_string()),
                modified: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                    + Duration::minutes(n),
            };
            revisions.push((revision, media.clone()));
        }
        state.feed.push(id.clone());
        state.objects.insert(id, object.clone());
        Ok(object)
    }

    async fn get_object(
        &self,
        _credential: &Credential,
        id: &RemoteId,
    ) -> anyhow::Result<RemoteObject> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("get:{id}"))?;
        state
            .objects
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("404 {id}"))
    }

    async fn delete_object(&self, _credential: &Credential, id: &RemoteId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("delete:{id}"))?;
        state.objects.remove(id.as_str());
        state.bodies.remove(id.as_str());
        state.feed.push(id.to_string());
        Ok(())
    }

    async fn download(&self, _credential: &Credential, id: &RemoteId) -> anyhow::Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("download:{id}"))?;
        state
            .bodies
            .get(id.as_str())
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| anyhow!("404 {id}"))
    }

    async fn get_changes(
        &self,
        _credential: &Credential,
        token: Option<&PageToken>,
        _include_removed: bool,
    ) -> anyhow::Result<ChangeFeedPage> {
        let mut state = self.state.lock().unwrap();
        state.record("changes".to_string())?;

        let end = state.feed.len();
        let start = match token {
            Some(token) => token.as_str().parse::<usize>()?.min(end),
            None => end,
        };
        let mut seen = HashSet::new();
        let entries = state.feed[start..]
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .map(|id| ChangeFeedEntry {
                file_id: rid(id),
                file: state.objects.get(id).cloned(),
            })
            .collect();

        Ok(ChangeFeedPage {
            entries,
            next_page_token: PageToken::new(end.to_string())?,
        })
    }

    async fn list_revisions(
        &self,
        _credential: &Credential,
        id: &RemoteId,
    ) -> anyhow::Result<Vec<Revision>> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("revisions:{id}"))?;
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
        let mut state = self.state.lock().unwrap();
        state.record(format!("revision:{id}:{revision_id}"))?;
        state
            .revisions
            .get(id.as_str())
            .and_then(|revisions| revisions.iter().find(|(r, _)| r.id == revision_id))
            .map(|(_, body)| body.clone().into_bytes())
            .ok_or_else(|| anyhow!("404 revision {revision_id}"))
    }
}

// ============================================================================
// Harness
// ============================================================================

/// An engine wired to a fake remote and in-memory local state
pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub sync_data: Arc<MemorySyncDataStore>,
    pub state: Arc<MemoryStateRepository>,
    pub engine: SyncEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_remote(Arc::new(FakeRemote::default()))
    }

    /// A fresh local state against an existing remote
    pub fn with_remote(remote: Arc<FakeRemote>) -> Self {
        Self::with_parts(
            remote,
            Arc::new(MemorySyncDataStore::new()),
            Arc::new(MemoryStateRepository::new()),
        )
    }

    pub fn with_parts(
        remote: Arc<FakeRemote>,
        sync_data: Arc<MemorySyncDataStore>,
        state: Arc<MemoryStateRepository>,
    ) -> Self {
        let engine = SyncEngine::new(
            remote.clone(),
            sync_data.clone(),
            state.clone(),
            credential(),
            &config(),
        );
        Self {
            remote,
            sync_data,
            state,
            engine,
        }
    }

    /// Resolves a new workspace and positions the change feed after it
    pub async fn resolved() -> (Self, Workspace) {
        let harness = Self::new();
        let workspace = harness.engine.resolve_workspace(None).await.unwrap();
        harness.engine.poll_changes().await.unwrap();
        (harness, workspace)
    }

    pub async fn ledger(&self) -> Vec<SyncData> {
        self.sync_data.all().await.unwrap()
    }

    pub async fn entry(&self, item_id: &str) -> Option<SyncData> {
        self.sync_data.get_by_item_id(item_id).await.unwrap()
    }
}
