//! Schema backed by a JSON reference tree.
//!
//! The reference format nests objects by node name. Every node carries a
//! `node_data` record; tag node children are defined directly below the tag
//! node, without a level for the (unknown) tag value:
//!
//! ```json
//! {
//!   "interfaces": {
//!     "node_data": {"node_type": "node"},
//!     "ethernet": {
//!       "node_data": {"node_type": "tag"},
//!       "address": {"node_data": {"node_type": "leaf", "multi": true}},
//!       "mtu": {"node_data": {"node_type": "leaf", "default_value": "1500"}}
//!     }
//!   }
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{NodeKind, Schema, SchemaError};
use crate::path::ConfigPath;

const NODE_DATA: &str = "node_data";
const COMPONENT_VERSION: &str = "component_version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RefNodeType {
    Node,
    Tag,
    Leaf,
}

#[derive(Debug, Clone, Deserialize)]
struct NodeData {
    node_type: RefNodeType,
    #[serde(default)]
    multi: bool,
    #[serde(default)]
    valueless: bool,
    #[serde(default)]
    default_value: Option<String>,
}

impl NodeData {
    fn of(node_type: RefNodeType) -> Self {
        Self {
            node_type,
            multi: false,
            valueless: false,
            default_value: None,
        }
    }
}

#[derive(Debug, Clone)]
struct RefNode {
    data: NodeData,
    children: IndexMap<String, RefNode>,
}

impl RefNode {
    fn is_tag(&self) -> bool {
        self.data.node_type == RefNodeType::Tag
    }

    fn is_leaf(&self) -> bool {
        self.data.node_type == RefNodeType::Leaf
    }

    fn kind(&self) -> NodeKind {
        match self.data.node_type {
            RefNodeType::Node => NodeKind::NonLeaf,
            RefNodeType::Tag => NodeKind::TagNode,
            RefNodeType::Leaf if self.data.multi => NodeKind::MultiLeaf,
            RefNodeType::Leaf if self.data.valueless => NodeKind::ValuelessLeaf,
            RefNodeType::Leaf => NodeKind::SingleLeaf,
        }
    }

    fn default(&self) -> Option<Value> {
        let value = self.data.default_value.as_ref()?;
        if self.data.multi {
            Some(Value::Array(
                value
                    .split_whitespace()
                    .map(|v| Value::String(v.to_string()))
                    .collect(),
            ))
        } else {
            Some(Value::String(value.clone()))
        }
    }
}

/// Outcome of walking a path through the reference tree.
enum Resolved<'a> {
    Root,
    Node(&'a RefNode),
    /// The path ends on a tag value of this tag node.
    TagValue(&'a RefNode),
}

/// Schema loaded from a JSON reference tree.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSchema {
    root: IndexMap<String, RefNode>,
}

impl ReferenceSchema {
    /// A schema that knows no nodes; every non-root path is `Unknown`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts building a schema in code.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Parses a reference tree from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Builds a schema from an already parsed reference tree.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let Value::Object(obj) = value else {
            return Err(SchemaError::InvalidDefinition {
                path: String::new(),
                reason: "reference root must be an object".to_string(),
            });
        };
        Ok(Self {
            root: parse_children(obj, &[])?,
        })
    }

    /// Reads a reference tree from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let schema = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), nodes = schema.root.len(), "Loaded schema reference");
        Ok(schema)
    }

    fn resolve(&self, path: &ConfigPath) -> Option<Resolved<'_>> {
        let tokens = path.tokens();
        let mut children = &self.root;
        let mut current = None;
        let mut i = 0;
        while i < tokens.len() {
            let node = children.get(&tokens[i])?;
            i += 1;
            if node.is_tag() && i < tokens.len() {
                if i == tokens.len() - 1 {
                    return Some(Resolved::TagValue(node));
                }
                // Skip the tag value
                i += 1;
            }
            children = &node.children;
            current = Some(node);
        }
        Some(current.map_or(Resolved::Root, Resolved::Node))
    }
}

fn display_path(path: &[String]) -> String {
    path.join(" ")
}

fn parse_children(
    obj: &Map<String, Value>,
    path: &[String],
) -> Result<IndexMap<String, RefNode>, SchemaError> {
    let mut children = IndexMap::new();
    for (name, value) in obj {
        if name == NODE_DATA || name == COMPONENT_VERSION {
            continue;
        }
        let mut child_path = path.to_vec();
        child_path.push(name.clone());

        let Value::Object(child) = value else {
            return Err(SchemaError::InvalidDefinition {
                path: display_path(&child_path),
                reason: "node definition must be an object".to_string(),
            });
        };
        let raw = child
            .get(NODE_DATA)
            .ok_or_else(|| SchemaError::InvalidDefinition {
                path: display_path(&child_path),
                reason: "missing node_data".to_string(),
            })?;
        let data: NodeData =
            serde_json::from_value(raw.clone()).map_err(|e| SchemaError::InvalidDefinition {
                path: display_path(&child_path),
                reason: e.to_string(),
            })?;
        let grandchildren = parse_children(child, &child_path)?;
        if data.node_type == RefNodeType::Leaf && !grandchildren.is_empty() {
            return Err(SchemaError::InvalidDefinition {
                path: display_path(&child_path),
                reason: "leaf nodes cannot have children".to_string(),
            });
        }
        children.insert(
            name.clone(),
            RefNode {
                data,
                children: grandchildren,
            },
        );
    }
    Ok(children)
}

fn collect_defaults(children: &IndexMap<String, RefNode>, recursive: bool) -> Map<String, Value> {
    let mut res = Map::new();
    for (name, child) in children {
        if child.is_leaf() {
            if let Some(default) = child.default() {
                res.insert(name.clone(), default);
            }
        } else if child.is_tag() {
            // Tag node defaults need a tag value to attach to
            continue;
        } else if recursive {
            let nested = collect_defaults(&child.children, true);
            if !nested.is_empty() {
                res.insert(name.clone(), Value::Object(nested));
            }
        }
    }
    res
}

impl Schema for ReferenceSchema {
    fn kind(&self, path: &ConfigPath) -> NodeKind {
        match self.resolve(path) {
            None => NodeKind::Unknown,
            Some(Resolved::Root) | Some(Resolved::TagValue(_)) => NodeKind::NonLeaf,
            Some(Resolved::Node(node)) => node.kind(),
        }
    }

    fn defaults(&self, path: &ConfigPath, recursive: bool) -> Map<String, Value> {
        match self.resolve(path) {
            None => Map::new(),
            Some(Resolved::Root) => collect_defaults(&self.root, recursive),
            Some(Resolved::TagValue(tag)) => collect_defaults(&tag.children, recursive),
            Some(Resolved::Node(node)) if node.is_tag() => Map::new(),
            Some(Resolved::Node(node)) if node.is_leaf() => {
                let mut res = Map::new();
                if let (Some(default), Some(last)) = (node.default(), path.last()) {
                    res.insert(last.to_string(), default);
                }
                res
            }
            Some(Resolved::Node(node)) => collect_defaults(&node.children, recursive),
        }
    }

    fn is_tag_value(&self, path: &ConfigPath) -> bool {
        matches!(self.resolve(path), Some(Resolved::TagValue(_)))
    }
}

/// Builds a [`ReferenceSchema`] in code.
///
/// Paths name reference nodes only, without tag values. Missing parents are
/// created as plain interior nodes.
///
/// ```rust
/// use cfgmgmt::schema::{NodeKind, ReferenceSchema, Schema};
/// use cfgmgmt::config_path;
///
/// let schema = ReferenceSchema::builder()
///     .tag("interfaces ethernet")
///     .multi("interfaces ethernet address")
///     .leaf("service ssh port")
///     .default_value("service ssh port", "22")
///     .build();
///
/// assert_eq!(schema.kind(&config_path!("interfaces ethernet eth0")), NodeKind::NonLeaf);
/// assert!(schema.is_multi(&config_path!("interfaces ethernet eth0 address")));
/// assert_eq!(schema.defaults(&config_path!("service ssh"), false)["port"], "22");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    root: IndexMap<String, RefNode>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn define(mut self, path: &str, data: NodeData) -> Self {
        let tokens: Vec<&str> = path.split_whitespace().collect();
        let Some((last, parents)) = tokens.split_last() else {
            return self;
        };
        let mut children = &mut self.root;
        for token in parents {
            let node = children
                .entry(token.to_string())
                .or_insert_with(|| RefNode {
                    data: NodeData::of(RefNodeType::Node),
                    children: IndexMap::new(),
                });
            children = &mut node.children;
        }
        match children.get_mut(*last) {
            Some(existing) => existing.data = data,
            None => {
                children.insert(
                    last.to_string(),
                    RefNode {
                        data,
                        children: IndexMap::new(),
                    },
                );
            }
        }
        self
    }

    fn find_mut(&mut self, path: &str) -> Option<&mut RefNode> {
        let mut tokens = path.split_whitespace();
        let mut node = self.root.get_mut(tokens.next()?)?;
        for token in tokens {
            node = node.children.get_mut(token)?;
        }
        Some(node)
    }

    /// Defines a plain interior node.
    pub fn node(self, path: &str) -> Self {
        self.define(path, NodeData::of(RefNodeType::Node))
    }

    /// Defines a tag node.
    pub fn tag(self, path: &str) -> Self {
        self.define(path, NodeData::of(RefNodeType::Tag))
    }

    /// Defines a single-valued leaf.
    pub fn leaf(self, path: &str) -> Self {
        self.define(path, NodeData::of(RefNodeType::Leaf))
    }

    /// Defines a multi-valued leaf.
    pub fn multi(self, path: &str) -> Self {
        let mut data = NodeData::of(RefNodeType::Leaf);
        data.multi = true;
        self.define(path, data)
    }

    /// Defines a presence-only leaf.
    pub fn valueless(self, path: &str) -> Self {
        let mut data = NodeData::of(RefNodeType::Leaf);
        data.valueless = true;
        self.define(path, data)
    }

    /// Attaches a default to a leaf, defining it as a single leaf if absent.
    ///
    /// Multi-valued defaults are whitespace separated.
    pub fn default_value(mut self, path: &str, value: &str) -> Self {
        if self.find_mut(path).is_none() {
            self = self.leaf(path);
        }
        if let Some(node) = self.find_mut(path) {
            node.data.default_value = Some(value.to_string());
        }
        self
    }

    pub fn build(self) -> ReferenceSchema {
        ReferenceSchema { root: self.root }
    }
}
