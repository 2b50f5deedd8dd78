//! Error types for configuration sessions.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`Session`](super::Session) and its config sources.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation needs the proposed tree but no configure session is open.
    #[error("{operation} requires a configuration session")]
    NotInSession {
        /// The rejected operation
        operation: String,
    },

    /// A configuration file could not be read or written.
    #[error("Cannot access configuration {}", path.display())]
    SourceUnavailable {
        /// The configuration file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// Check if this error rejects a proposed-tree operation outside a session.
    pub fn is_not_in_session(&self) -> bool {
        matches!(self, SessionError::NotInSession { .. })
    }

    /// Check if this error is an I/O failure.
    pub fn is_io_error(&self) -> bool {
        matches!(self, SessionError::SourceUnavailable { .. })
    }

    pub(crate) fn not_in_session(operation: impl Into<String>) -> Self {
        SessionError::NotInSession {
            operation: operation.into(),
        }
    }
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
