//! Human-readable diff output.

use super::{DiffError, DiffTree};
use crate::path::ConfigPath;
use crate::tree::{Children, Command, ConfigTree, Node, node_lines, set_commands};

/// Commands that turn `left` into `right` below `path`.
///
/// Deletions come first, then additions. A replaced single value yields only
/// the `set`, and a removed value of a surviving multi leaf is deleted by
/// value.
pub fn diff_commands(left: &ConfigTree, right: &ConfigTree, path: &ConfigPath) -> Vec<Command> {
    let diff = DiffTree::new(left, right);
    let mut out = Vec::new();
    if let Some(removed) = diff.sub().node_at(path) {
        delete_commands(&mut out, path, removed, right);
    }
    if let Some(added) = diff.add().node_at(path) {
        set_commands(&mut out, path, added);
    }
    out
}

fn delete_commands(out: &mut Vec<Command>, path: &ConfigPath, removed: &Node, right: &ConfigTree) {
    let delete = |value: Option<&String>| Command::Delete {
        path: path.clone(),
        value: value.cloned(),
    };
    let current = right.node_at(path);
    match removed {
        Node::NonLeaf(children) | Node::Tag(children) => {
            if current.is_some_and(|node| node.kind() == removed.kind()) {
                for (name, child) in children {
                    delete_commands(out, &path.child_unchecked(name.as_str()), child, right);
                }
            } else {
                out.push(delete(None));
            }
        }
        Node::Leaf(_) => {
            if !matches!(current, Some(Node::Leaf(_))) {
                out.push(delete(None));
            }
        }
        Node::Multi(values) => {
            if matches!(current, Some(Node::Multi(_))) {
                out.extend(values.iter().map(|value| delete(Some(value))));
            } else {
                out.push(delete(None));
            }
        }
        Node::Valueless => out.push(delete(None)),
    }
}

/// Renders the difference between `left` and `right` below `path`.
///
/// The commands form lists `delete`/`set` commands with full paths. The
/// show form prints the text form of both trees relative to `path` with a
/// one-character gutter: `+` added, `-` removed, ` ` context. Unchanged
/// subtrees are omitted. Identical trees render as an empty string.
pub fn show_diff(
    left: &ConfigTree,
    right: &ConfigTree,
    path: &ConfigPath,
    commands: bool,
) -> Result<String, DiffError> {
    if !path.is_root() && !left.exists(path) && !right.exists(path) {
        return Err(DiffError::PathNotFound { path: path.clone() });
    }
    if commands {
        let lines: Vec<String> = diff_commands(left, right, path)
            .iter()
            .map(ToString::to_string)
            .collect();
        return Ok(lines.join("\n"));
    }

    let mut lines = Vec::new();
    let (l, r) = (left.node_at(path), right.node_at(path));
    match (l, r, path.last()) {
        (Some(Node::NonLeaf(a)), Some(Node::NonLeaf(b)), _) => show_children(&mut lines, a, b, 0),
        (Some(Node::NonLeaf(a)), None, _) => show_children(&mut lines, a, &Children::new(), 0),
        (None, Some(Node::NonLeaf(b)), _) => show_children(&mut lines, &Children::new(), b, 0),
        (l, r, Some(name)) => show_node(&mut lines, name, l, r, 0),
        _ => {}
    }
    Ok(lines.join("\n"))
}

fn gutter(lines: &mut Vec<String>, mark: char, body: Vec<String>) {
    lines.extend(body.into_iter().map(|line| format!("{mark}{line}")));
}

fn show_children(lines: &mut Vec<String>, a: &Children, b: &Children, depth: usize) {
    for (name, node) in a {
        show_node(lines, name, Some(node), b.get(name), depth);
    }
    for (name, node) in b {
        if !a.contains_key(name) {
            show_node(lines, name, None, Some(node), depth);
        }
    }
}

fn show_node(lines: &mut Vec<String>, name: &str, left: Option<&Node>, right: Option<&Node>, depth: usize) {
    match (left, right) {
        (None, None) => {}
        (None, Some(node)) => gutter(lines, '+', node_lines(name, node, depth)),
        (Some(node), None) => gutter(lines, '-', node_lines(name, node, depth)),
        (Some(a), Some(b)) if a == b => {}
        (Some(Node::NonLeaf(a)), Some(Node::NonLeaf(b))) => {
            let indent = "    ".repeat(depth);
            lines.push(format!(" {indent}{name} {{"));
            show_children(lines, a, b, depth + 1);
            lines.push(format!(" {indent}}}"));
        }
        (Some(Node::Tag(a)), Some(Node::Tag(b))) => {
            for (value, node) in a {
                show_node(lines, &format!("{name} {value}"), Some(node), b.get(value), depth);
            }
            for (value, node) in b {
                if !a.contains_key(value) {
                    show_node(lines, &format!("{name} {value}"), None, Some(node), depth);
                }
            }
        }
        (Some(Node::Multi(a)), Some(Node::Multi(b))) => {
            let line = |value: &String| {
                node_lines(name, &Node::Leaf(value.clone()), depth)
            };
            for value in a {
                let mark = if b.contains(value) { ' ' } else { '-' };
                gutter(lines, mark, line(value));
            }
            for value in b.iter().filter(|value| !a.contains(value)) {
                gutter(lines, '+', line(value));
            }
        }
        (Some(a), Some(b)) => {
            gutter(lines, '-', node_lines(name, a, depth));
            gutter(lines, '+', node_lines(name, b, depth));
        }
    }
}
