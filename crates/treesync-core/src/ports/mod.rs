//! Driven ports
//!
//! Adapters implement these traits; the use cases only see them as
//! `Arc<dyn Trait + Send + Sync>`.
//!
//! - [`IRemoteStorage`]: objects, bodies, the change feed and revisions
//! - [`ISyncDataStore`]: the ledger mapping local items to remote objects
//! - [`IStateRepository`]: known workspaces, their page tokens and the
//!   published location

pub mod remote_storage;
pub mod state_repository;
pub mod sync_data_store;

pub use remote_storage::{
    property, ChangeFeedEntry, ChangeFeedPage, Credential, IRemoteStorage, Properties, RemoteObject,
    Revision, UploadRequest,
};
pub use state_repository::IStateRepository;
pub use sync_data_store::ISyncDataStore;
