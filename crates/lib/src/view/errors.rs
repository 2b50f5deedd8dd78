//! Error types for dictionary projections.

use thiserror::Error;

use crate::path::ConfigPath;

/// Errors raised while building a [`DictView`](super::DictView).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ViewError {
    /// The key mangling pattern is not a valid regular expression.
    #[error("Invalid key mangling pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The key mangling replacement would produce keys with whitespace.
    #[error("Invalid key mangling replacement {replacement:?}: keys cannot contain whitespace")]
    InvalidReplacement { replacement: String },

    /// The projected data contradicts the schema.
    #[error("Projection of '{path}' contradicts the schema: {reason}")]
    SchemaMismatch { path: ConfigPath, reason: String },
}

impl ViewError {
    /// Check if this error was caused by the key mangling option.
    pub fn is_invalid_mangling(&self) -> bool {
        matches!(
            self,
            ViewError::InvalidPattern { .. } | ViewError::InvalidReplacement { .. }
        )
    }

    /// Check if this error reports data contradicting the schema.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, ViewError::SchemaMismatch { .. })
    }
}

impl From<ViewError> for crate::Error {
    fn from(err: ViewError) -> Self {
        crate::Error::View(err)
    }
}
