//! Text and command-list renderings of a configuration tree.

use std::fmt;

use super::{ConfigTree, Node};
use crate::path::ConfigPath;

const INDENT: &str = "    ";

/// Quotes a leaf or tag value for the text format when it would not survive a
/// round trip through the parser as a bare word.
pub fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.starts_with("//")
        || value.contains("/*")
        || value.contains("*/")
        || value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "{}\"';#\\".contains(c));
    if !needs_quotes {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Lines of the text form of one named node, indented `depth` levels.
///
/// Tag nodes expand to one `name value {` block per tag value; empty tag
/// nodes and empty multi leaves produce no lines.
pub(crate) fn node_lines(name: &str, node: &Node, depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    write_node(&mut lines, name, node, depth);
    lines
}

fn write_node(lines: &mut Vec<String>, name: &str, node: &Node, depth: usize) {
    let indent = INDENT.repeat(depth);
    match node {
        Node::NonLeaf(children) => {
            lines.push(format!("{indent}{name} {{"));
            for (child, node) in children {
                write_node(lines, child, node, depth + 1);
            }
            lines.push(format!("{indent}}}"));
        }
        Node::Tag(values) => {
            for (tag_value, node) in values {
                write_node(lines, &format!("{name} {}", quote_value(tag_value)), node, depth);
            }
        }
        Node::Leaf(value) => lines.push(format!("{indent}{name} {}", quote_value(value))),
        Node::Multi(values) => {
            for value in values {
                lines.push(format!("{indent}{name} {}", quote_value(value)));
            }
        }
        Node::Valueless => lines.push(format!("{indent}{name}")),
    }
}

impl ConfigTree {
    /// The text form of the whole tree, trailer included.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        for (name, node) in self.root_children() {
            write_node(&mut lines, name, node, 0);
        }
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        if !self.trailer().is_empty() {
            text.push_str(self.trailer());
            text.push('\n');
        }
        text
    }

    /// The text form of the node at `path`, relative to that node.
    ///
    /// Interior nodes render their children; a leaf renders itself. The
    /// trailer is omitted.
    pub fn to_text_at(&self, path: &ConfigPath) -> String {
        let mut lines = Vec::new();
        match (self.node_at(path), path.last()) {
            (Some(Node::NonLeaf(children)), _) => {
                for (name, node) in children {
                    write_node(&mut lines, name, node, 0);
                }
            }
            (Some(node), Some(name)) => write_node(&mut lines, name, node, 0),
            _ => {}
        }
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    /// The tree as `set` commands, one per line.
    pub fn to_commands(&self) -> String {
        self.to_commands_at(&ConfigPath::root())
    }

    /// `set` commands for the node at `path` and its descendants.
    pub fn to_commands_at(&self, path: &ConfigPath) -> String {
        self.commands_at(path)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_path;
    use crate::schema::ReferenceSchema;

    const TEXT: &str = "interfaces {
    ethernet eth0 {
        address 10.0.0.1/24
        address 10.0.0.2/24
        description \"uplink port\"
        disable
    }
    ethernet eth1 {
    }
}
system {
    host-name r1
}
// vyos-config-version: \"system@27\"
";

    #[test]
    fn test_text_round_trip_is_stable() {
        let tree = ConfigTree::parse(TEXT).unwrap();
        assert_eq!(tree.to_text(), TEXT);
        assert_eq!(tree.to_string(), TEXT);
    }

    #[test]
    fn test_quote_value() {
        assert_eq!(quote_value("r1"), "r1");
        assert_eq!(quote_value("10.0.0.1/24"), "10.0.0.1/24");
        assert_eq!(quote_value(""), "\"\"");
        assert_eq!(quote_value("two words"), "\"two words\"");
        assert_eq!(quote_value("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_value("a{b"), "\"a{b\"");
        assert_eq!(quote_value("//x"), "\"//x\"");
        assert_eq!(quote_value("c:\\dir"), "\"c:\\\\dir\"");
    }

    #[test]
    fn test_awkward_values_survive_reparse() {
        let values = ["", "two words", "a\"b", "x\\y", "/* c */", "//lead", "{}", "tab\there"];
        for value in values {
            let text = format!("system {{\n    note {}\n}}\n", quote_value(value));
            let tree = ConfigTree::parse(&text).unwrap();
            assert!(tree.exists(&config_path!("system note")), "{value:?}");
            let stored = match tree.node_at(&config_path!("system note")) {
                Some(Node::Leaf(v)) => v.clone(),
                other => panic!("unexpected node {other:?}"),
            };
            assert_eq!(stored, value);
        }
    }

    #[test]
    fn test_awkward_tag_values_survive_reparse() {
        let schema = ReferenceSchema::builder()
            .tag("interfaces ethernet")
            .leaf("interfaces ethernet description")
            .build();
        for tag in ["\"eth0", "a{b", "//x", "'q'", "c}", "x\\y"] {
            let path = ConfigPath::parse(["interfaces", "ethernet", tag, "description"]).unwrap();
            let mut tree = ConfigTree::new();
            tree.set(&schema, &path, Some("d"), true).unwrap();

            let reparsed = ConfigTree::parse_with_schema(&tree.to_text(), &schema).unwrap();
            assert_eq!(
                reparsed.children(&config_path!("interfaces ethernet")),
                vec![tag],
                "{tag:?}"
            );
            assert_eq!(reparsed.to_json_value(), tree.to_json_value(), "{tag:?}");
            assert_eq!(reparsed.to_text(), tree.to_text(), "{tag:?}");
        }
    }

    #[test]
    fn test_commands() {
        let tree = ConfigTree::parse(TEXT).unwrap();
        assert_eq!(
            tree.to_commands(),
            "set interfaces ethernet eth0 address '10.0.0.1/24'
set interfaces ethernet eth0 address '10.0.0.2/24'
set interfaces ethernet eth0 description 'uplink port'
set interfaces ethernet eth0 disable
set interfaces ethernet eth1
set system host-name 'r1'"
        );
        assert_eq!(
            tree.to_commands_at(&config_path!("system")),
            "set system host-name 'r1'"
        );
        assert_eq!(tree.to_commands_at(&config_path!("nope")), "");
    }

    #[test]
    fn test_text_at() {
        let tree = ConfigTree::parse(TEXT).unwrap();
        assert_eq!(tree.to_text_at(&config_path!("system")), "host-name r1\n");
        assert_eq!(
            tree.to_text_at(&config_path!("system host-name")),
            "host-name r1\n"
        );
        assert_eq!(
            tree.to_text_at(&config_path!("interfaces ethernet")),
            "ethernet eth0 {
    address 10.0.0.1/24
    address 10.0.0.2/24
    description \"uplink port\"
    disable
}
ethernet eth1 {
}
"
        );
        assert_eq!(tree.to_text_at(&config_path!("nope")), "");
    }
}
