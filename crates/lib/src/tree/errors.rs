//! Error types for configuration tree parsing and mutation.

use thiserror::Error;

use crate::path::ConfigPath;
use crate::schema::NodeKind;

/// Errors raised by [`ConfigTree`](super::ConfigTree) mutations and the text parser.
///
/// Queries never fail; missing paths produce absent values instead.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    /// A mutation contradicts the node kind at `path`.
    #[error("Cannot modify '{path}' as {kind}: {reason}")]
    SchemaMismatch {
        path: ConfigPath,
        kind: NodeKind,
        reason: String,
    },

    /// A delete or rename named a node that does not exist.
    #[error("Path '{path}' does not exist")]
    NotFound { path: ConfigPath },

    /// A rename would overwrite an existing sibling.
    #[error("Path '{path}' already exists")]
    AlreadyExists { path: ConfigPath },

    /// The configuration text is malformed.
    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

impl TreeError {
    /// Check if this error reports a node kind conflict.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, TreeError::SchemaMismatch { .. })
    }

    /// Check if this error reports a missing node.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound { .. })
    }

    /// Check if this error reports a name collision.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, TreeError::AlreadyExists { .. })
    }

    /// Check if this error came from the text parser.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, TreeError::Parse { .. })
    }

    /// Get the affected path, if the error is about one.
    pub fn path(&self) -> Option<&ConfigPath> {
        match self {
            TreeError::SchemaMismatch { path, .. }
            | TreeError::NotFound { path }
            | TreeError::AlreadyExists { path } => Some(path),
            TreeError::Parse { .. } => None,
        }
    }
}

impl From<TreeError> for crate::Error {
    fn from(err: TreeError) -> Self {
        crate::Error::Tree(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_path;

    #[test]
    fn test_error_helpers() {
        let err = TreeError::SchemaMismatch {
            path: config_path!("system host-name"),
            kind: NodeKind::SingleLeaf,
            reason: "a value is required".to_string(),
        };
        assert!(err.is_schema_mismatch());
        assert_eq!(err.path(), Some(&config_path!("system host-name")));

        let err = TreeError::NotFound {
            path: config_path!("system"),
        };
        assert!(err.is_not_found());

        let err = TreeError::Parse {
            line: 3,
            reason: "unexpected '}'".to_string(),
        };
        assert!(err.is_parse_error());
        assert!(err.path().is_none());
        assert_eq!(err.to_string(), "Parse error on line 3: unexpected '}'");
    }

    #[test]
    fn test_error_conversion() {
        let err = TreeError::AlreadyExists {
            path: config_path!("a"),
        };
        let crate_err: crate::Error = err.into();
        assert_eq!(crate_err.module(), "tree");
        assert!(!crate_err.is_io_error());
    }
}
