//!
//! cfgmgmt: hierarchical router configuration with commit, confirm, archive
//! and rollback.
//!
//! ## Core Concepts
//!
//! * **Paths (`path::ConfigPath`)**: Sequences of tokens addressing a node, relative to an edit level.
//! * **Trees (`tree::ConfigTree`)**: The ordered configuration tree and its text and command forms.
//! * **Schemas (`schema::Schema`)**: Node kinds and default values from the reference tree.
//! * **Diffs (`diff::ChangeDetector`)**: Structural differences between two trees, as node sets, commands or gutter text.
//! * **Views (`view::Projector`)**: JSON projections of a subtree with key mangling and defaults.
//! * **Sessions (`session::Session`)**: The running and proposed trees one invocation reads and edits.
//! * **Archive (`archive::Archive`)**: Compressed revisions of the committed config plus the commit log.
//! * **Commits (`commit::CommitEngine`)**: The commit pipeline, commit-confirm, rollback and compare.

pub mod archive;
pub mod clock;
pub mod commit;
pub mod constants;
pub mod diff;
pub mod path;
pub mod schema;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tree;
pub mod view;

pub use clock::{Clock, SystemClock, format_timestamp};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;

/// Re-export the `ConfigPath` struct for easier access.
pub use path::ConfigPath;

/// Result type used throughout the cfgmgmt library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the cfgmgmt library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured path errors from the path module
    #[error(transparent)]
    Path(path::PathError),

    /// Structured schema errors from the schema module
    #[error(transparent)]
    Schema(schema::SchemaError),

    /// Structured tree errors from the tree module
    #[error(transparent)]
    Tree(tree::TreeError),

    /// Structured diff errors from the diff module
    #[error(transparent)]
    Diff(diff::DiffError),

    /// Structured projection errors from the view module
    #[error(transparent)]
    View(view::ViewError),

    /// Structured session errors from the session module
    #[error(transparent)]
    Session(session::SessionError),

    /// Structured archive errors from the archive module
    #[error(transparent)]
    Archive(archive::ArchiveError),

    /// Structured commit errors from the commit module
    #[error(transparent)]
    Commit(commit::CommitError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Path(_) => "path",
            Error::Schema(_) => "schema",
            Error::Tree(_) => "tree",
            Error::Diff(_) => "diff",
            Error::View(_) => "view",
            Error::Session(_) => "session",
            Error::Archive(_) => "archive",
            Error::Commit(_) => "commit",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Schema(schema_err) => schema_err.is_io_error(),
            Error::Session(session_err) => session_err.is_io_error(),
            Error::Archive(archive_err) => archive_err.is_io_error() || archive_err.is_unavailable(),
            Error::Commit(commit_err) => commit_err.is_io_error(),
            _ => false,
        }
    }

    /// Check if this error is a node kind conflict.
    pub fn is_schema_mismatch(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_schema_mismatch(),
            Error::View(view_err) => view_err.is_schema_mismatch(),
            _ => false,
        }
    }

    /// Check if this error rejects a malformed path.
    pub fn is_invalid_path(&self) -> bool {
        match self {
            Error::Path(path_err) => path_err.is_invalid_token(),
            Error::Diff(diff_err) => diff_err.is_path_not_found(),
            _ => false,
        }
    }

    /// Check if this error needs a configure session.
    pub fn is_not_in_session(&self) -> bool {
        match self {
            Error::Session(session_err) => session_err.is_not_in_session(),
            _ => false,
        }
    }

    /// Check if this error names a revision outside the archive.
    pub fn is_missing_revision(&self) -> bool {
        match self {
            Error::Archive(archive_err) => archive_err.is_missing_revision(),
            _ => false,
        }
    }

    /// Check if an archived revision exists but cannot be read.
    pub fn is_archive_unavailable(&self) -> bool {
        match self {
            Error::Archive(archive_err) => archive_err.is_unavailable(),
            _ => false,
        }
    }

    /// Check if this error rejects a second commit-confirm.
    pub fn is_confirm_pending(&self) -> bool {
        match self {
            Error::Commit(commit_err) => commit_err.is_confirm_pending(),
            _ => false,
        }
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Commit(commit_err) => commit_err.is_validation_error(),
            Error::Schema(schema_err) => schema_err.is_invalid_definition(),
            _ => false,
        }
    }

    /// Process exit code for this error: 2 for system failures, 1 for
    /// rejected requests.
    pub fn exit_code(&self) -> i32 {
        if self.is_io_error() { 2 } else { 1 }
    }
}
