//! Cooperative cancellation
//!
//! A [`Deadline`] is a caller-supplied predicate answering "does this write
//! still matter?". Transfers evaluate it immediately before each remote
//! mutation. When it answers `false` the step is skipped and nothing is
//! recorded; this is reported as an abandoned outcome, not an error.

use std::fmt;
use std::sync::Arc;

/// Predicate evaluated before each remote mutation
#[derive(Clone)]
pub struct Deadline(Option<Arc<dyn Fn() -> bool + Send + Sync>>);

impl Deadline {
    /// A deadline that never expires
    pub fn none() -> Self {
        Self(None)
    }

    /// A deadline backed by the given predicate
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self(Some(Arc::new(predicate)))
    }

    /// Returns true if the caller still wants the write to happen
    pub fn is_live(&self) -> bool {
        self.0.as_ref().map_or(true, |predicate| predicate())
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Deadline")
            .field(&if self.0.is_some() { "predicate" } else { "none" })
            .finish()
    }
}
