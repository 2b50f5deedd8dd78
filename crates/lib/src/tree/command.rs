//! `set`/`delete` operations, the command form of a tree or a diff.

use std::fmt;

use super::{ConfigTree, Node, TreeError};
use crate::path::ConfigPath;
use crate::schema::Schema;

/// One configuration operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the node at `path`, with `value` for leaves.
    Set {
        path: ConfigPath,
        value: Option<String>,
    },
    /// Remove the node at `path`, or only `value` from its leaf.
    Delete {
        path: ConfigPath,
        value: Option<String>,
    },
}

impl Command {
    pub fn path(&self) -> &ConfigPath {
        match self {
            Command::Set { path, .. } | Command::Delete { path, .. } => path,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Command::Delete { .. })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (verb, path, value) = match self {
            Command::Set { path, value } => ("set", path, value),
            Command::Delete { path, value } => ("delete", path, value),
        };
        write!(f, "{verb} {path}")?;
        if let Some(value) = value {
            write!(f, " '{value}'")?;
        }
        Ok(())
    }
}

/// Appends the `set` commands that recreate `node` at `path`.
pub(crate) fn set_commands(out: &mut Vec<Command>, path: &ConfigPath, node: &Node) {
    let set = |value: Option<&String>| Command::Set {
        path: path.clone(),
        value: value.cloned(),
    };
    match node {
        Node::NonLeaf(children) if children.is_empty() => {
            if !path.is_root() {
                out.push(set(None));
            }
        }
        Node::NonLeaf(children) | Node::Tag(children) => {
            for (name, child) in children {
                set_commands(out, &path.child_unchecked(name.as_str()), child);
            }
        }
        Node::Leaf(value) => out.push(set(Some(value))),
        Node::Multi(values) => out.extend(values.iter().map(|value| set(Some(value)))),
        Node::Valueless => out.push(set(None)),
    }
}

impl ConfigTree {
    /// The tree as a list of `set` commands.
    pub fn commands_at(&self, path: &ConfigPath) -> Vec<Command> {
        let mut out = Vec::new();
        if let Some(node) = self.node_at(path) {
            set_commands(&mut out, path, node);
        }
        out
    }

    /// Applies one command.
    ///
    /// `set` appends to multi leaves; deleting a missing node is an error.
    pub fn apply(&mut self, schema: &dyn Schema, command: &Command) -> Result<(), TreeError> {
        match command {
            Command::Set { path, value } => self.set(schema, path, value.as_deref(), false),
            Command::Delete { path, value: None } => self.delete(path),
            Command::Delete {
                path,
                value: Some(value),
            } => self.delete_value(path, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_path;
    use crate::schema::ReferenceSchema;

    #[test]
    fn test_display() {
        let set = Command::Set {
            path: config_path!("system host-name"),
            value: Some("r1".to_string()),
        };
        assert_eq!(set.to_string(), "set system host-name 'r1'");
        let delete = Command::Delete {
            path: config_path!("interfaces ethernet eth0 disable"),
            value: None,
        };
        assert_eq!(delete.to_string(), "delete interfaces ethernet eth0 disable");
        assert!(delete.is_delete());
        assert_eq!(delete.path(), &config_path!("interfaces ethernet eth0 disable"));
    }

    #[test]
    fn test_apply_rebuilds_tree() {
        let schema = ReferenceSchema::builder()
            .tag("interfaces ethernet")
            .multi("interfaces ethernet address")
            .valueless("interfaces ethernet disable")
            .leaf("system host-name")
            .build();
        let text = "interfaces {\n    ethernet eth0 {\n        address 10.0.0.1/24\n        address 10.0.0.2/24\n        disable\n    }\n}\nsystem {\n    host-name r1\n}\n";
        let source = ConfigTree::parse_with_schema(text, &schema).unwrap();

        let mut rebuilt = ConfigTree::new();
        for command in source.commands_at(&ConfigPath::root()) {
            rebuilt.apply(&schema, &command).unwrap();
        }
        assert_eq!(rebuilt, source);

        rebuilt
            .apply(
                &schema,
                &Command::Delete {
                    path: config_path!("interfaces ethernet eth0 address"),
                    value: Some("10.0.0.2/24".to_string()),
                },
            )
            .unwrap();
        assert_eq!(
            rebuilt.values(&config_path!("interfaces ethernet eth0 address")),
            &["10.0.0.1/24".to_string()]
        );
    }
}
