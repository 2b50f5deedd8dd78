//! In-memory typed configuration tree.
//!
//! A [`ConfigTree`] is a root [`Node::NonLeaf`] whose descendants are one of
//! five node kinds. Children of interior nodes are kept in insertion order,
//! which for parsed trees is the order of the configuration text.
//!
//! Queries take a [`ConfigPath`] and never fail: a missing path yields
//! `false`, `None` or an empty list. Mutations consult a [`Schema`] so that a
//! node is only ever created with the kind the schema assigns to its path.
//!
//! ```rust
//! use cfgmgmt::config_path;
//! use cfgmgmt::schema::ReferenceSchema;
//! use cfgmgmt::tree::ConfigTree;
//!
//! let schema = ReferenceSchema::builder()
//!     .leaf("system host-name")
//!     .multi("system name-server")
//!     .build();
//!
//! let mut tree = ConfigTree::new();
//! tree.set(&schema, &config_path!("system host-name"), Some("r1"), true)?;
//! tree.append(&schema, &config_path!("system name-server"), "1.1.1.1")?;
//! tree.append(&schema, &config_path!("system name-server"), "8.8.8.8")?;
//!
//! assert_eq!(tree.value(&config_path!("system host-name")), Some("r1"));
//! assert_eq!(tree.values(&config_path!("system name-server")).len(), 2);
//! assert!(tree.exists(&config_path!("system name-server 8.8.8.8")));
//! # Ok::<(), cfgmgmt::tree::TreeError>(())
//! ```

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde_json::{Map, Value};

use crate::path::ConfigPath;
use crate::schema::{NodeKind, Schema};

mod command;
mod errors;
mod parser;
mod render;

pub use command::Command;
pub use errors::TreeError;
pub use render::quote_value;

pub(crate) use command::set_commands;
pub(crate) use render::node_lines;

/// Ordered children of an interior node.
pub type Children = IndexMap<String, Node>;

/// One position in a configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Interior node with fixed child names.
    NonLeaf(Children),
    /// Interior node keyed by tag value; every child is a `NonLeaf`.
    Tag(Children),
    /// Leaf with one value.
    Leaf(String),
    /// Leaf with an ordered list of distinct values.
    Multi(Vec<String>),
    /// Presence-only leaf.
    Valueless,
}

impl Node {
    pub fn empty() -> Self {
        Node::NonLeaf(Children::new())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::NonLeaf(_) => NodeKind::NonLeaf,
            Node::Tag(_) => NodeKind::TagNode,
            Node::Leaf(_) => NodeKind::SingleLeaf,
            Node::Multi(_) => NodeKind::MultiLeaf,
            Node::Valueless => NodeKind::ValuelessLeaf,
        }
    }

    pub fn is_interior(&self) -> bool {
        matches!(self, Node::NonLeaf(_) | Node::Tag(_))
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            Node::NonLeaf(children) | Node::Tag(children) => Some(children),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            Node::NonLeaf(children) | Node::Tag(children) => Some(children),
            _ => None,
        }
    }

    /// JSON projection: interior nodes are objects, single leaves strings,
    /// multi leaves arrays and valueless leaves empty objects.
    pub fn to_json(&self) -> Value {
        match self {
            Node::NonLeaf(children) | Node::Tag(children) => {
                Value::Object(children_to_json(children))
            }
            Node::Leaf(value) => Value::String(value.clone()),
            Node::Multi(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
            Node::Valueless => Value::Object(Map::new()),
        }
    }

    /// Merges `other` into this node; `other` wins for single values.
    pub(crate) fn merge(&mut self, other: Node) -> Result<(), String> {
        match (self, other) {
            (Node::NonLeaf(mine), Node::NonLeaf(theirs)) | (Node::Tag(mine), Node::Tag(theirs)) => {
                merge_children(mine, theirs)
            }
            (Node::Leaf(mine), Node::Leaf(theirs)) => {
                *mine = theirs;
                Ok(())
            }
            (Node::Multi(mine), Node::Multi(theirs)) => {
                for value in theirs {
                    if !mine.contains(&value) {
                        mine.push(value);
                    }
                }
                Ok(())
            }
            (Node::Valueless, Node::Valueless) => Ok(()),
            (mine, theirs) => Err(format!(
                "cannot merge {} into {}",
                theirs.kind(),
                mine.kind()
            )),
        }
    }
}

pub(crate) fn children_to_json(children: &Children) -> Map<String, Value> {
    children
        .iter()
        // Empty tag nodes have no text form
        .filter(|(_, node)| !matches!(node, Node::Tag(values) if values.is_empty()))
        .map(|(name, node)| (name.clone(), node.to_json()))
        .collect()
}

pub(crate) fn merge_children(into: &mut Children, from: Children) -> Result<(), String> {
    for (name, node) in from {
        match into.entry(name) {
            Entry::Occupied(mut entry) => {
                let key = entry.key().clone();
                entry
                    .get_mut()
                    .merge(node)
                    .map_err(|reason| format!("{key}: {reason}"))?;
            }
            Entry::Vacant(entry) => {
                entry.insert(node);
            }
        }
    }
    Ok(())
}

/// A configuration tree plus the comment block that trails its text form.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    root: Node,
    trailer: String,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Trees compare by content; the trailing comment block is ignored.
impl PartialEq for ConfigTree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for ConfigTree {}

impl ConfigTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self {
            root: Node::empty(),
            trailer: String::new(),
        }
    }

    /// Builds a tree from root children.
    pub fn from_children(children: Children) -> Self {
        Self {
            root: Node::NonLeaf(children),
            trailer: String::new(),
        }
    }

    /// Parses configuration text and re-classifies leaves with `schema`.
    pub fn parse_with_schema(text: &str, schema: &dyn Schema) -> Result<Self, TreeError> {
        let mut tree = Self::parse(text)?;
        tree.conform(schema);
        Ok(tree)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_children(&self) -> &Children {
        match &self.root {
            Node::NonLeaf(children) => children,
            // The root is always a NonLeaf
            _ => unreachable!("configuration tree root must be an interior node"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root_children().is_empty()
    }

    /// Comment block preserved after the last node of the text form.
    pub fn trailer(&self) -> &str {
        &self.trailer
    }

    pub fn set_trailer(&mut self, trailer: impl Into<String>) {
        self.trailer = trailer.into().trim().to_string();
    }

    /// The node at `path`; the root path yields the root node.
    pub fn node_at(&self, path: &ConfigPath) -> Option<&Node> {
        let mut node = &self.root;
        for token in path {
            node = node.children()?.get(token)?;
        }
        Some(node)
    }

    fn node_at_mut(&mut self, path: &ConfigPath) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for token in path {
            node = node.children_mut()?.get_mut(token)?;
        }
        Some(node)
    }

    /// True if `path` names a node, or a value of the leaf at its parent.
    pub fn exists(&self, path: &ConfigPath) -> bool {
        if self.node_at(path).is_some() {
            return true;
        }
        let (Some(parent), Some(last)) = (path.parent(), path.last()) else {
            return false;
        };
        match self.node_at(&parent) {
            Some(Node::Leaf(value)) => value == last,
            Some(Node::Multi(values)) => values.iter().any(|v| v == last),
            _ => false,
        }
    }

    /// Value of a single leaf; an empty value reads as `None`.
    pub fn value(&self, path: &ConfigPath) -> Option<&str> {
        match self.node_at(path) {
            Some(Node::Leaf(value)) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    /// Values of a multi leaf; empty when absent.
    pub fn values(&self, path: &ConfigPath) -> &[String] {
        match self.node_at(path) {
            Some(Node::Multi(values)) => values,
            _ => &[],
        }
    }

    /// Names of the children of an interior node, in order.
    pub fn children(&self, path: &ConfigPath) -> Vec<&str> {
        self.node_at(path)
            .and_then(Node::children)
            .map(|children| children.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Kind of the node at `path` as stored, or `Unknown` when absent.
    pub fn kind_at(&self, path: &ConfigPath) -> NodeKind {
        self.node_at(path).map_or(NodeKind::Unknown, Node::kind)
    }

    pub fn is_tag(&self, path: &ConfigPath) -> bool {
        matches!(self.node_at(path), Some(Node::Tag(_)))
    }

    /// True if the final token of `path` is a value of a tag node in this tree.
    pub fn is_tag_value(&self, path: &ConfigPath) -> bool {
        path.parent().is_some_and(|parent| self.is_tag(&parent))
    }

    /// Sets a node, creating missing interior nodes along the way.
    ///
    /// Single leaves require a value and always replace. Multi leaves require
    /// a value and either replace the list or append to it. Valueless leaves
    /// and interior nodes take no value.
    pub fn set(
        &mut self,
        schema: &dyn Schema,
        path: &ConfigPath,
        value: Option<&str>,
        replace: bool,
    ) -> Result<(), TreeError> {
        let kind = schema.kind(path);
        let mismatch = |reason: &str| TreeError::SchemaMismatch {
            path: path.clone(),
            kind,
            reason: reason.to_string(),
        };

        let Some(name) = path.last() else {
            return Err(mismatch("the root cannot be set"));
        };
        match (kind, value) {
            (NodeKind::Unknown, _) => return Err(mismatch("path is not defined")),
            (NodeKind::SingleLeaf | NodeKind::MultiLeaf, None) => {
                return Err(mismatch("a value is required"));
            }
            (NodeKind::NonLeaf | NodeKind::TagNode | NodeKind::ValuelessLeaf, Some(_)) => {
                return Err(mismatch("node does not take a value"));
            }
            (NodeKind::TagNode, None) if !self.is_tag(path) => {
                return Err(mismatch("a tag node needs a tag value"));
            }
            _ => {}
        }

        let parent = path.parent().unwrap_or_default();
        let children = self.ensure_interior(schema, &parent)?;
        match (kind, value, children.get_mut(name)) {
            (NodeKind::SingleLeaf, Some(value), Some(Node::Leaf(current))) => {
                *current = value.to_string();
            }
            (NodeKind::SingleLeaf, Some(value), None) => {
                children.insert(name.to_string(), Node::Leaf(value.to_string()));
            }
            (NodeKind::MultiLeaf, Some(value), Some(node @ (Node::Multi(_) | Node::Leaf(_)))) => {
                // A leaf parsed without a schema may hold a single multi value
                if let Node::Leaf(single) = node {
                    *node = Node::Multi(vec![std::mem::take(single)]);
                }
                if let Node::Multi(values) = node {
                    if replace {
                        *values = vec![value.to_string()];
                    } else if !values.iter().any(|v| v == value) {
                        values.push(value.to_string());
                    }
                }
            }
            (NodeKind::MultiLeaf, Some(value), None) => {
                children.insert(name.to_string(), Node::Multi(vec![value.to_string()]));
            }
            (NodeKind::ValuelessLeaf, None, Some(Node::Valueless))
            | (NodeKind::NonLeaf, None, Some(Node::NonLeaf(_)))
            | (NodeKind::TagNode, None, Some(Node::Tag(_))) => {}
            (NodeKind::ValuelessLeaf, None, None) => {
                children.insert(name.to_string(), Node::Valueless);
            }
            (NodeKind::NonLeaf, None, None) => {
                children.insert(name.to_string(), Node::empty());
            }
            (_, _, Some(existing)) => {
                let existing = existing.kind();
                return Err(mismatch(&format!("existing node is a {existing}")));
            }
            _ => return Err(mismatch("unsupported mutation")),
        }
        tracing::trace!(path = %path, ?value, replace, "Set configuration node");
        Ok(())
    }

    /// Adds a value to a multi leaf, or sets a single leaf.
    pub fn append(
        &mut self,
        schema: &dyn Schema,
        path: &ConfigPath,
        value: &str,
    ) -> Result<(), TreeError> {
        self.set(schema, path, Some(value), false)
    }

    /// Creates a valueless leaf or an empty interior node.
    pub fn set_valueless(&mut self, schema: &dyn Schema, path: &ConfigPath) -> Result<(), TreeError> {
        self.set(schema, path, None, true)
    }

    /// Walks to the interior node at `path`, creating missing nodes with the
    /// kind the schema assigns. Children of tag nodes are tag values and are
    /// always created as plain interior nodes.
    fn ensure_interior(
        &mut self,
        schema: &dyn Schema,
        path: &ConfigPath,
    ) -> Result<&mut Children, TreeError> {
        let mut node = &mut self.root;
        for (depth, token) in path.iter().enumerate() {
            let prefix = path.truncated(depth + 1);
            let parent_is_tag = matches!(node, Node::Tag(_));
            let parent_kind = node.kind();
            let Some(children) = node.children_mut() else {
                return Err(TreeError::SchemaMismatch {
                    path: path.truncated(depth),
                    kind: parent_kind,
                    reason: "cannot descend into a leaf".to_string(),
                });
            };
            node = match children.entry(token.to_string()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let created = if parent_is_tag {
                        Node::empty()
                    } else {
                        match schema.kind(&prefix) {
                            NodeKind::NonLeaf => Node::empty(),
                            NodeKind::TagNode => Node::Tag(Children::new()),
                            kind => {
                                return Err(TreeError::SchemaMismatch {
                                    path: prefix,
                                    kind,
                                    reason: "expected an interior node".to_string(),
                                });
                            }
                        }
                    };
                    entry.insert(created)
                }
            };
        }
        let kind = node.kind();
        node.children_mut().ok_or_else(|| TreeError::SchemaMismatch {
            path: path.clone(),
            kind,
            reason: "cannot descend into a leaf".to_string(),
        })
    }

    /// Removes the node at `path`; deleting the root clears the tree.
    ///
    /// A tag node left without values is removed as well.
    pub fn delete(&mut self, path: &ConfigPath) -> Result<(), TreeError> {
        let Some(name) = path.last() else {
            self.root = Node::empty();
            return Ok(());
        };
        let parent = path.parent().unwrap_or_default();
        let removed = self
            .node_at_mut(&parent)
            .and_then(Node::children_mut)
            .and_then(|children| children.shift_remove(name));
        if removed.is_none() {
            return Err(TreeError::NotFound { path: path.clone() });
        }
        self.prune_empty_tag(&parent);
        tracing::trace!(path = %path, "Deleted configuration node");
        Ok(())
    }

    /// Removes one value from the leaf at `path`.
    ///
    /// Removing the last value of a leaf removes the leaf.
    pub fn delete_value(&mut self, path: &ConfigPath, value: &str) -> Result<(), TreeError> {
        let remove_node = match self.node_at_mut(path) {
            Some(Node::Multi(values)) => {
                let before = values.len();
                values.retain(|v| v != value);
                if values.len() == before {
                    return Err(TreeError::NotFound {
                        path: path.child_unchecked(value),
                    });
                }
                values.is_empty()
            }
            Some(Node::Leaf(current)) if current == value => true,
            _ => {
                return Err(TreeError::NotFound {
                    path: path.child_unchecked(value),
                });
            }
        };
        if remove_node {
            self.delete(path)?;
        }
        Ok(())
    }

    /// Renames the final token of `path`, keeping its position.
    pub fn rename(&mut self, path: &ConfigPath, new_name: &str) -> Result<(), TreeError> {
        let (Some(parent), Some(old_name)) = (path.parent(), path.last()) else {
            return Err(TreeError::NotFound { path: path.clone() });
        };
        let target = parent.child(new_name).map_err(|_| TreeError::SchemaMismatch {
            path: path.clone(),
            kind: self.kind_at(path),
            reason: format!("invalid name {new_name:?}"),
        })?;
        let children = self
            .node_at_mut(&parent)
            .and_then(Node::children_mut)
            .ok_or_else(|| TreeError::NotFound { path: path.clone() })?;
        if children.contains_key(new_name) {
            return Err(TreeError::AlreadyExists { path: target });
        }
        let (index, _, node) = children
            .shift_remove_full(old_name)
            .ok_or_else(|| TreeError::NotFound { path: path.clone() })?;
        children.shift_insert(index, new_name.to_string(), node);
        Ok(())
    }

    /// Marks an interior node as a tag node.
    pub fn set_tag(&mut self, path: &ConfigPath) -> Result<(), TreeError> {
        match self.node_at_mut(path) {
            Some(node @ Node::NonLeaf(_)) => {
                let Node::NonLeaf(children) = std::mem::replace(node, Node::Valueless) else {
                    unreachable!("matched NonLeaf above");
                };
                if !children.values().all(Node::is_interior) {
                    let kind = NodeKind::NonLeaf;
                    *node = Node::NonLeaf(children);
                    return Err(TreeError::SchemaMismatch {
                        path: path.clone(),
                        kind,
                        reason: "tag values must be interior nodes".to_string(),
                    });
                }
                *node = Node::Tag(children);
                Ok(())
            }
            Some(Node::Tag(_)) => Ok(()),
            Some(node) => Err(TreeError::SchemaMismatch {
                path: path.clone(),
                kind: node.kind(),
                reason: "only interior nodes can become tag nodes".to_string(),
            }),
            None => Err(TreeError::NotFound { path: path.clone() }),
        }
    }

    fn prune_empty_tag(&mut self, path: &ConfigPath) {
        if path.is_root() {
            return;
        }
        let empty_tag = matches!(self.node_at(path), Some(Node::Tag(values)) if values.is_empty());
        if empty_tag {
            let _ = self.delete(path);
        }
    }

    /// Re-classifies leaves parsed without a schema.
    ///
    /// Text cannot tell a multi leaf holding one value from a single leaf;
    /// this converts such leaves where the schema says `MultiLeaf`.
    pub fn conform(&mut self, schema: &dyn Schema) {
        fn walk(children: &mut Children, path: &ConfigPath, schema: &dyn Schema) {
            for (name, node) in children.iter_mut() {
                let child_path = path.child_unchecked(name.as_str());
                match node {
                    Node::NonLeaf(grandchildren) | Node::Tag(grandchildren) => {
                        walk(grandchildren, &child_path, schema);
                    }
                    Node::Leaf(value) if schema.is_multi(&child_path) => {
                        *node = Node::Multi(vec![std::mem::take(value)]);
                    }
                    _ => {}
                }
            }
        }
        if let Node::NonLeaf(children) = &mut self.root {
            walk(children, &ConfigPath::root(), schema);
        }
    }

    /// Merges another tree into this one; the other tree wins for single values.
    pub fn merge(&mut self, other: &ConfigTree) -> Result<(), TreeError> {
        self.root
            .merge(other.root.clone())
            .map_err(|reason| TreeError::SchemaMismatch {
                path: ConfigPath::root(),
                kind: NodeKind::NonLeaf,
                reason,
            })
    }

    /// A tree holding only the node at `path` and its ancestors.
    pub fn subtree(&self, path: &ConfigPath) -> ConfigTree {
        let Some(node) = self.node_at(path) else {
            return ConfigTree::new();
        };
        if path.is_root() {
            return self.clone();
        }
        let mut wrapped = node.clone();
        for depth in (0..path.len()).rev() {
            let parent = path.truncated(depth);
            let mut children = Children::new();
            children.insert(path[depth].to_string(), wrapped);
            wrapped = if self.is_tag(&parent) {
                Node::Tag(children)
            } else {
                Node::NonLeaf(children)
            };
        }
        ConfigTree {
            root: wrapped,
            trailer: String::new(),
        }
    }

    /// JSON projection of the whole tree.
    pub fn to_json_value(&self) -> Value {
        self.root.to_json()
    }

    /// JSON projection of the whole tree as text.
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }
}
