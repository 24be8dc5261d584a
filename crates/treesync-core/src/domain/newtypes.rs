//! Validated string identifiers
//!
//! Ids and tokens cross the remote, ledger and state boundaries as plain
//! strings. Wrapping them keeps an empty or malformed value from reaching any
//! of those boundaries.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::hashing::to_base36;

/// String conversions shared by every identifier; construction goes through `new`
macro_rules! string_newtype {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s.to_owned())
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// ============================================================================
// RemoteId
// ============================================================================

/// Id of an object in remote storage
///
/// Opaque to us apart from two rules: it is non-empty, and it has no `/`
/// since `/` joins a remote id to the `content` suffix of content keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// # Errors
    /// [`DomainError::InvalidRemoteId`] for an empty id or one containing `/`
    pub fn new(id: String) -> Result<Self, DomainError> {
        match id.as_str() {
            "" => Err(DomainError::InvalidRemoteId("empty remote id".to_string())),
            s if s.contains('/') => Err(DomainError::InvalidRemoteId(format!(
                "'/' is not allowed in a remote id: {s}"
            ))),
            _ => Ok(Self(id)),
        }
    }
}

string_newtype!(RemoteId);

impl PartialEq<str> for RemoteId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

// ============================================================================
// PageToken
// ============================================================================

/// Position in the provider's change feed; only emptiness is checked
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: String) -> Result<Self, DomainError> {
        if token.is_empty() {
            return Err(DomainError::InvalidPageToken("empty page token".to_string()));
        }
        Ok(Self(token))
    }
}

string_newtype!(PageToken);

// ============================================================================
// WorkspaceId
// ============================================================================

/// Lowercase base-36 rendering of the workspace hash
///
/// See [`Workspace::make_id`](super::workspace::Workspace::make_id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// # Errors
    /// [`DomainError::InvalidWorkspaceId`] unless the id is non-empty base 36
    pub fn new(id: String) -> Result<Self, DomainError> {
        let base36 = |c: char| c.is_ascii_digit() || c.is_ascii_lowercase();
        if id.is_empty() || !id.chars().all(base36) {
            return Err(DomainError::InvalidWorkspaceId(format!(
                "not a base-36 workspace id: '{id}'"
            )));
        }
        Ok(Self(id))
    }

    pub(crate) fn from_hash(hash: u64) -> Self {
        Self(to_base36(hash))
    }
}

string_newtype!(WorkspaceId);
