//! Error types for loading schema reference data.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a schema reference tree.
///
/// Lookups against a loaded schema never fail; unknown paths classify as
/// [`NodeKind::Unknown`](super::NodeKind::Unknown).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The reference file could not be read.
    #[error("Cannot read schema reference {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The reference data is not valid JSON.
    #[error("Schema reference is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The reference data is JSON but does not describe a node tree.
    #[error("Invalid schema definition at '{path}': {reason}")]
    InvalidDefinition { path: String, reason: String },
}

impl SchemaError {
    /// Check if this error came from reading the reference file.
    pub fn is_io_error(&self) -> bool {
        matches!(self, SchemaError::Io { .. })
    }

    /// Check if this error describes malformed reference data.
    pub fn is_invalid_definition(&self) -> bool {
        matches!(
            self,
            SchemaError::Json(_) | SchemaError::InvalidDefinition { .. }
        )
    }
}

impl From<SchemaError> for crate::Error {
    fn from(err: SchemaError) -> Self {
        crate::Error::Schema(err)
    }
}
