//! Read-only oracle over the configuration grammar.
//!
//! A [`Schema`] classifies every [`ConfigPath`] into a [`NodeKind`], reports
//! multiplicity of leaves and contributes default values. It performs no
//! validation; trees are checked against it only when they are mutated.
//!
//! The bundled implementation is [`ReferenceSchema`], built from the JSON
//! reference tree format: nested objects keyed by node name, each carrying a
//! `node_data` record.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::path::ConfigPath;

mod errors;
mod reference;

pub use errors::SchemaError;
pub use reference::{ReferenceSchema, SchemaBuilder};

/// Classification of a tree position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Interior node with fixed child names.
    NonLeaf,
    /// Interior node whose children are user-chosen tag values.
    TagNode,
    /// Leaf holding at most one value.
    SingleLeaf,
    /// Leaf holding an ordered list of distinct values.
    MultiLeaf,
    /// Presence-only leaf.
    ValuelessLeaf,
    /// Not known to the schema, including leaf value positions.
    Unknown,
}

impl NodeKind {
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeKind::SingleLeaf | NodeKind::MultiLeaf | NodeKind::ValuelessLeaf
        )
    }

    pub fn is_interior(self) -> bool {
        matches!(self, NodeKind::NonLeaf | NodeKind::TagNode)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::NonLeaf => "node",
            NodeKind::TagNode => "tag node",
            NodeKind::SingleLeaf => "leaf",
            NodeKind::MultiLeaf => "multi-value leaf",
            NodeKind::ValuelessLeaf => "valueless leaf",
            NodeKind::Unknown => "unknown node",
        };
        f.write_str(name)
    }
}

/// Key mangling guidance for one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MangleHint {
    /// The final token of the path is a tag value and must be kept verbatim.
    pub preserve_tag_values: bool,
}

/// Records which keys of a projection were synthesized from defaults.
///
/// Paths are relative to the projection root and use the projection's
/// (possibly mangled) key names. A path counts as synthesized when it or any
/// of its ancestors was inserted from defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultsMeta {
    inserted: BTreeSet<ConfigPath>,
}

impl DefaultsMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, path: ConfigPath) {
        self.inserted.insert(path);
    }

    pub fn contains(&self, path: &ConfigPath) -> bool {
        (1..=path.len()).any(|len| self.inserted.contains(&path.truncated(len)))
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserted.len()
    }

    pub fn merge(&mut self, other: DefaultsMeta) {
        self.inserted.extend(other.inserted);
    }
}

/// Read-only oracle over the configuration grammar.
pub trait Schema: Send + Sync + fmt::Debug {
    /// Classifies a path; tag value positions are [`NodeKind::NonLeaf`].
    fn kind(&self, path: &ConfigPath) -> NodeKind;

    /// Defaults below `path` as a partial tree.
    ///
    /// Without `recursive` only the direct leaf children contribute. Descent
    /// never enters tag nodes, since no tag value is known. For a leaf path
    /// the result is `{last: default}`.
    fn defaults(&self, path: &ConfigPath, recursive: bool) -> Map<String, serde_json::Value>;

    /// Key mangling guidance for the final token of `path`.
    fn mangle_hint(&self, path: &ConfigPath) -> MangleHint {
        MangleHint {
            preserve_tag_values: self.is_tag_value(path),
        }
    }

    /// Reports whether a projected leaf was synthesized from defaults.
    fn from_defaults(&self, meta: &DefaultsMeta, path: &ConfigPath) -> bool {
        meta.contains(path)
    }

    fn is_tag(&self, path: &ConfigPath) -> bool {
        self.kind(path) == NodeKind::TagNode
    }

    fn is_multi(&self, path: &ConfigPath) -> bool {
        self.kind(path) == NodeKind::MultiLeaf
    }

    fn is_leaf(&self, path: &ConfigPath) -> bool {
        self.kind(path).is_leaf()
    }

    /// True if the final token of `path` is a value of a tag node.
    fn is_tag_value(&self, path: &ConfigPath) -> bool {
        path.parent().is_some_and(|parent| self.is_tag(&parent))
    }
}
