//! Structural differences between two configuration trees.
//!
//! [`DiffTree`] holds the two halves of a diff as trees of their own: `add`
//! contains what only the right tree has, `sub` what only the left tree has.
//! Both are built in one simultaneous descent. Multi leaf values are
//! compared as sets, single values by string equality, and a node whose kind
//! changed appears whole in both halves.
//!
//! [`ChangeDetector`] answers the questions generators ask about a pending
//! commit, relative to an edit level: did this subtree change, which children
//! appeared or vanished, what did this leaf hold before.

use std::ops::BitOr;

use serde_json::{Map, Value};
use tracing::trace;

use crate::path::ConfigPath;
use crate::schema::{DefaultsMeta, Schema};
use crate::tree::{Children, ConfigTree, Node, children_to_json};
use crate::view::{KeyMangling, merge_defaults, relative_defaults};

mod errors;
mod show;

pub use errors::DiffError;
pub use show::{diff_commands, show_diff};

/// The two halves of a diff between a left (old) and right (new) tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffTree {
    add: ConfigTree,
    sub: ConfigTree,
}

impl DiffTree {
    pub fn new(left: &ConfigTree, right: &ConfigTree) -> Self {
        let add = only_in(right.root_children(), left.root_children());
        let sub = only_in(left.root_children(), right.root_children());
        Self {
            add: ConfigTree::from_children(add),
            sub: ConfigTree::from_children(sub),
        }
    }

    /// Nodes and values present in the right tree only.
    pub fn add(&self) -> &ConfigTree {
        &self.add
    }

    /// Nodes and values present in the left tree only.
    pub fn sub(&self) -> &ConfigTree {
        &self.sub
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.sub.is_empty()
    }

    pub fn is_node_changed(&self, path: &ConfigPath) -> bool {
        self.add.exists(path) || self.sub.exists(path)
    }
}

impl ConfigTree {
    /// Diff with `self` as the left (old) tree.
    pub fn diff(&self, other: &ConfigTree) -> DiffTree {
        DiffTree::new(self, other)
    }
}

/// Children of `a` that are absent from, or differ in, `b`.
fn only_in(a: &Children, b: &Children) -> Children {
    let mut out = Children::new();
    for (name, node) in a {
        let diff = match b.get(name) {
            None => Some(node.clone()),
            Some(other) => node_only_in(node, other),
        };
        if let Some(diff) = diff {
            out.insert(name.clone(), diff);
        }
    }
    out
}

fn node_only_in(a: &Node, b: &Node) -> Option<Node> {
    match (a, b) {
        (Node::NonLeaf(x), Node::NonLeaf(y)) => {
            let children = only_in(x, y);
            (!children.is_empty()).then_some(Node::NonLeaf(children))
        }
        (Node::Tag(x), Node::Tag(y)) => {
            let children = only_in(x, y);
            (!children.is_empty()).then_some(Node::Tag(children))
        }
        (Node::Leaf(x), Node::Leaf(y)) => (x != y).then(|| Node::Leaf(x.clone())),
        (Node::Multi(x), Node::Multi(y)) => {
            let values: Vec<String> = x.iter().filter(|v| !y.contains(v)).cloned().collect();
            (!values.is_empty()).then_some(Node::Multi(values))
        }
        (Node::Valueless, Node::Valueless) => None,
        _ => Some(a.clone()),
    }
}

/// Value of a leaf as seen by [`ChangeDetector::value_diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafValue {
    Single(String),
    Multi(Vec<String>),
    /// A valueless leaf that is present.
    Valueless,
}

impl LeafValue {
    /// The values carried, empty for a valueless leaf.
    pub fn values(&self) -> Vec<String> {
        match self {
            LeafValue::Single(value) => vec![value.clone()],
            LeafValue::Multi(values) => values.clone(),
            LeafValue::Valueless => Vec::new(),
        }
    }

    fn same_as(&self, other: &LeafValue) -> bool {
        match (self, other) {
            (LeafValue::Multi(a), LeafValue::Multi(b)) => {
                a.len() == b.len() && a.iter().all(|v| b.contains(v))
            }
            _ => self == other,
        }
    }
}

/// Which parts of a [`ChildNodesDiff`] to expand into full mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Expand(u8);

impl Expand {
    pub const NONE: Expand = Expand(0);
    pub const MERGE: Expand = Expand(1);
    pub const DELETE: Expand = Expand(1 << 1);
    pub const ADD: Expand = Expand(1 << 2);
    pub const STABLE: Expand = Expand(1 << 3);

    pub fn contains(self, other: Expand) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Expand {
    type Output = Expand;

    fn bitor(self, rhs: Expand) -> Expand {
        Expand(self.0 | rhs.0)
    }
}

/// One key set of a [`ChildNodesDiff`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChildNodes {
    /// Child names only.
    Names(Vec<String>),
    /// Child names with their projected content.
    Expanded(Map<String, Value>),
}

impl ChildNodes {
    pub fn names(&self) -> Vec<&str> {
        match self {
            ChildNodes::Names(names) => names.iter().map(String::as_str).collect(),
            ChildNodes::Expanded(map) => map.keys().map(String::as_str).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ChildNodes::Names(names) => names.is_empty(),
            ChildNodes::Expanded(map) => map.is_empty(),
        }
    }

    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self {
            ChildNodes::Expanded(map) => Some(map),
            ChildNodes::Names(_) => None,
        }
    }
}

/// Child-level differences under one path.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildNodesDiff {
    /// Children of the new tree.
    pub merge: ChildNodes,
    /// Children only in the old tree.
    pub delete: ChildNodes,
    /// Children only in the new tree.
    pub add: ChildNodes,
    /// Children in both trees.
    pub stable: ChildNodes,
}

/// Change queries between an old (running) and a new (proposed) tree.
#[derive(Debug)]
pub struct ChangeDetector<'a> {
    old: &'a ConfigTree,
    new: &'a ConfigTree,
    schema: &'a dyn Schema,
    diff: DiffTree,
    level: ConfigPath,
    key_mangling: Option<KeyMangling>,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(old: &'a ConfigTree, new: &'a ConfigTree, schema: &'a dyn Schema) -> Self {
        Self {
            old,
            new,
            schema,
            diff: DiffTree::new(old, new),
            level: ConfigPath::root(),
            key_mangling: None,
        }
    }

    pub fn with_level(mut self, level: ConfigPath) -> Self {
        self.level = level;
        self
    }

    pub fn with_key_mangling(mut self, mangling: KeyMangling) -> Self {
        self.key_mangling = Some(mangling);
        self
    }

    pub fn set_level(&mut self, level: ConfigPath) {
        self.level = level;
    }

    pub fn level(&self) -> &ConfigPath {
        &self.level
    }

    pub fn diff_tree(&self) -> &DiffTree {
        &self.diff
    }

    fn abs(&self, path: &ConfigPath) -> ConfigPath {
        ConfigPath::concat(&self.level, path)
    }

    /// True if anything at or below `path` was added or removed.
    pub fn is_node_changed(&self, path: &ConfigPath) -> bool {
        self.diff.is_node_changed(&self.abs(path))
    }

    /// Child names under `path`, split into merge/delete/add/stable sets.
    ///
    /// Sets named in `expand` carry the projected content of each child;
    /// the `merge` set is completed with schema defaults. With `recursive`,
    /// `delete` and `add` come from the diff trees, so they also report
    /// changes nested inside children present in both trees.
    pub fn child_nodes_diff(&self, path: &ConfigPath, expand: Expand, recursive: bool) -> ChildNodesDiff {
        let abs = self.abs(path);
        let session = object_at(self.new, &abs);
        let effective = object_at(self.old, &abs);

        let (delete_src, add_src) = if recursive {
            (object_at(self.diff.sub(), &abs), object_at(self.diff.add(), &abs))
        } else {
            let delete = effective
                .iter()
                .filter(|(k, _)| !session.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let add = session
                .iter()
                .filter(|(k, _)| !effective.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (delete, add)
        };
        let stable_src: Map<String, Value> = session
            .iter()
            .filter(|(k, _)| effective.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let diff = ChildNodesDiff {
            merge: self.child_nodes(&abs, session, expand.contains(Expand::MERGE), true),
            delete: self.child_nodes(&abs, delete_src, expand.contains(Expand::DELETE), false),
            add: self.child_nodes(&abs, add_src, expand.contains(Expand::ADD), false),
            stable: self.child_nodes(&abs, stable_src, expand.contains(Expand::STABLE), false),
        };
        trace!(path = %abs, ?expand, recursive, "Computed child node diff");
        diff
    }

    fn child_nodes(
        &self,
        abs: &ConfigPath,
        source: Map<String, Value>,
        expanded: bool,
        with_defaults: bool,
    ) -> ChildNodes {
        if !expanded {
            return ChildNodes::Names(source.keys().cloned().collect());
        }
        let defaults = with_defaults.then(|| relative_defaults(self.schema, abs, &source, true));
        let mut map = self.mangle(source, abs);
        if let Some(defaults) = defaults {
            let defaults = self.mangle(defaults, abs);
            merge_defaults(&mut map, defaults, &ConfigPath::root(), &mut DefaultsMeta::new());
        }
        ChildNodes::Expanded(map)
    }

    fn mangle(&self, data: Map<String, Value>, base: &ConfigPath) -> Map<String, Value> {
        match &self.key_mangling {
            Some(mangling) => mangling.apply_to_map(data, base, &|path: &ConfigPath| {
                self.schema.mangle_hint(path).preserve_tag_values
            }),
            None => data,
        }
    }

    /// `(new, old)` values of the leaf at `path`; `None` where absent.
    pub fn value_diff(&self, path: &ConfigPath) -> Result<(Option<LeafValue>, Option<LeafValue>), DiffError> {
        let abs = self.abs(path);
        let read = |tree: &ConfigTree| match tree.node_at(&abs) {
            None => Ok(None),
            Some(Node::Leaf(value)) => Ok(Some(LeafValue::Single(value.clone()))),
            Some(Node::Multi(values)) => Ok(Some(LeafValue::Multi(values.clone()))),
            Some(Node::Valueless) => Ok(Some(LeafValue::Valueless)),
            Some(Node::NonLeaf(_) | Node::Tag(_)) => Err(DiffError::NotALeaf { path: abs.clone() }),
        };
        Ok((read(self.new)?, read(self.old)?))
    }

    /// How the leaf at `path` changed.
    ///
    /// `None` when unchanged; `Some([])` when the leaf is new or is a
    /// valueless leaf that appeared or vanished; otherwise the old values
    /// that the new leaf no longer holds.
    pub fn leaf_node_changed(&self, path: &ConfigPath) -> Result<Option<Vec<String>>, DiffError> {
        let (new, old) = self.value_diff(path)?;
        let changed = match (&new, &old) {
            (None, None) => None,
            (Some(new), Some(old)) if new.same_as(old) => None,
            (_, None) => Some(Vec::new()),
            (_, Some(LeafValue::Valueless)) | (Some(LeafValue::Valueless), _) => Some(Vec::new()),
            (new, Some(old)) => {
                let kept = new.as_ref().map(LeafValue::values).unwrap_or_default();
                Some(
                    old.values()
                        .into_iter()
                        .filter(|value| !kept.contains(value))
                        .collect(),
                )
            }
        };
        Ok(changed)
    }
}

fn object_at(tree: &ConfigTree, path: &ConfigPath) -> Map<String, Value> {
    tree.node_at(path)
        .and_then(Node::children)
        .map(children_to_json)
        .unwrap_or_default()
}
