//! Use cases (interactors) for TreeSync
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`BootstrapWorkspaceUseCase`] - Creates or repairs the workspace folders
//! - [`ProcessChangesUseCase`] - Reads and classifies the remote change feed
//! - [`TransferUseCase`] - Hash-gated uploads and downloads of single items
//! - [`ReadRevisionsUseCase`] - Revision history of a synced item

pub mod bootstrap_workspace;
pub mod process_changes;
pub mod read_revisions;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

pub use bootstrap_workspace::BootstrapWorkspaceUseCase;
pub use process_changes::{ItemDeriver, ProcessChangesUseCase};
pub use read_revisions::{ReadRevisionsUseCase, RevisionInfo};
pub use transfer::{TransferOutcome, TransferUseCase};
