//! TreeSync core
//!
//! Reconciles a local document tree with a folder in remote object storage.
//! Nothing in this crate performs I/O directly:
//!
//! - `domain` holds the values that move between the tree and the remote
//!   (`Workspace`, `Item`, `Content`, `SyncData`, `Change`)
//! - `ports` declares what the engine needs from the outside
//!   (`IRemoteStorage`, `ISyncDataStore`, `IStateRepository`)
//! - `usecases` drives those ports: workspace bootstrap, change-feed
//!   processing, transfers and revision reads
//! - `config` maps the YAML settings file

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
