//! Error types for change detection.

use thiserror::Error;

use crate::path::ConfigPath;

/// Errors raised by [`ChangeDetector`](super::ChangeDetector) and
/// [`show_diff`](super::show_diff).
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiffError {
    /// A value query named an interior node.
    #[error("'{path}' is not a leaf node")]
    NotALeaf { path: ConfigPath },

    /// The path exists in neither tree.
    #[error("Path '{path}' does not exist in either configuration")]
    PathNotFound { path: ConfigPath },
}

impl DiffError {
    /// Check if this error came from a value query on an interior node.
    pub fn is_not_a_leaf(&self) -> bool {
        matches!(self, DiffError::NotALeaf { .. })
    }

    /// Check if this error reports a path missing from both trees.
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, DiffError::PathNotFound { .. })
    }
}

impl From<DiffError> for crate::Error {
    fn from(err: DiffError) -> Self {
        crate::Error::Diff(err)
    }
}
