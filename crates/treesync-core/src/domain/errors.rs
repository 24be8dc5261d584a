//! Domain error types
//!
//! [`DomainError`] covers validation failures of domain values.
//! [`SyncError`] is the error taxonomy surfaced by the synchronization use cases.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote object ID
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid change-feed page token
    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),

    /// Invalid workspace ID
    #[error("Invalid workspace ID: {0}")]
    InvalidWorkspaceId(String),

    /// A payload could not be decoded into an item or content
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors surfaced by workspace bootstrap, change processing, transfers
/// and revision queries
///
/// Transport and store failures are carried unmodified so the caller can
/// decide on retry and backoff. A failed deadline check is not an error;
/// see `TransferOutcome::Abandoned`.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote folder already belongs to a different workspace
    #[error("Remote folder {folder_id} is part of another workspace ({claimed_by})")]
    Conflict {
        /// The folder that was being opened
        folder_id: String,
        /// The folder id stored in its property bag
        claimed_by: String,
    },

    /// The remote object cannot be read (missing or forbidden)
    #[error("Remote object {id} is not accessible, check permissions")]
    Access {
        /// The remote id that failed
        id: String,
        /// Underlying transport error
        #[source]
        source: anyhow::Error,
    },

    /// A remote payload could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// No sync mapping exists for the given local item
    #[error("No sync data for item {0}")]
    NotFound(String),

    /// The credential lacks the capabilities required by the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// An operation needs a workspace but none has been resolved yet
    #[error("No workspace has been resolved")]
    WorkspaceNotResolved,

    /// The sync-data store or state repository failed
    #[error("Store error: {0:#}")]
    Store(anyhow::Error),

    /// The remote transport failed
    #[error("Transport error: {0:#}")]
    Transport(#[from] anyhow::Error),

    /// A domain-level validation error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SyncError {
    /// Returns true if retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::Store(_))
    }
}
