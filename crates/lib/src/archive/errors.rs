//! Error types for the revision archive.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing the revision archive.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The requested revision number is outside the commit log.
    #[error("Invalid revision number {rev}: {available} revisions available")]
    MissingRevision {
        /// The requested revision
        rev: usize,
        /// Number of entries in the commit log
        available: usize,
    },

    /// An archived revision file is missing or cannot be decompressed.
    #[error("Archive file {} unavailable: {reason}", path.display())]
    Unavailable {
        /// The archive file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Reading or replacing an archive file failed.
    #[error("I/O error on {}", path.display())]
    Io {
        /// The file being accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    /// Check if this error is an out-of-range revision number.
    pub fn is_missing_revision(&self) -> bool {
        matches!(self, ArchiveError::MissingRevision { .. })
    }

    /// Check if this error is an unreadable archive file.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ArchiveError::Unavailable { .. })
    }

    /// Check if this error is an I/O failure.
    pub fn is_io_error(&self) -> bool {
        matches!(self, ArchiveError::Io { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ArchiveError> for crate::Error {
    fn from(err: ArchiveError) -> Self {
        crate::Error::Archive(err)
    }
}
