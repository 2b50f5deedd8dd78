//! Error types for the commit engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`CommitEngine`](super::CommitEngine) and its
/// capabilities.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CommitError {
    /// A commit-confirm timer is already armed.
    #[error("Another confirm is pending")]
    ConfirmPending,

    /// The validator rejected the proposed configuration.
    #[error("Commit validation failed: {}", errors.join("; "))]
    ValidationFailed {
        /// One message per problem
        errors: Vec<String>,
    },

    /// An external helper failed.
    #[error("{command}: {reason}")]
    Subprocess {
        /// The command line that was run
        command: String,
        /// Exit status or error output
        reason: String,
    },

    /// A file of the commit machinery could not be written.
    #[error("I/O error on {}", path.display())]
    Io {
        /// The file being accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl CommitError {
    /// Check if this error rejects a second commit-confirm.
    pub fn is_confirm_pending(&self) -> bool {
        matches!(self, CommitError::ConfirmPending)
    }

    /// Check if this error is a validator rejection.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, CommitError::ValidationFailed { .. })
    }

    /// Check if this error comes from a filesystem or subprocess failure.
    pub fn is_io_error(&self) -> bool {
        matches!(self, CommitError::Io { .. } | CommitError::Subprocess { .. })
    }

    pub(crate) fn subprocess(command: impl Into<String>, reason: impl Into<String>) -> Self {
        CommitError::Subprocess {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

impl From<CommitError> for crate::Error {
    fn from(err: CommitError) -> Self {
        crate::Error::Commit(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_helpers() {
        let err = CommitError::ConfirmPending;
        assert!(err.is_confirm_pending());
        assert!(!err.is_io_error());
        assert_eq!(err.to_string(), "Another confirm is pending");

        let err = CommitError::ValidationFailed {
            errors: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.is_validation_error());
        assert_eq!(err.to_string(), "Commit validation failed: a; b");

        let err = CommitError::subprocess("systemctl reboot", "exit status: 1");
        assert!(err.is_io_error());
        assert_eq!(err.to_string(), "systemctl reboot: exit status: 1");
    }

    #[test]
    fn test_error_conversion() {
        let crate_err: crate::Error = CommitError::ConfirmPending.into();
        assert_eq!(crate_err.module(), "commit");
        assert!(crate_err.is_confirm_pending());
        assert_eq!(crate_err.exit_code(), 1);

        let crate_err: crate::Error = CommitError::subprocess("gzip", "failed").into();
        assert_eq!(crate_err.exit_code(), 2);
    }
}
