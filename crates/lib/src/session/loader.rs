//! Applying a whole tree to a proposed tree as edit commands.

use std::fmt;

use tracing::debug;

use crate::Result;
use crate::diff::diff_commands;
use crate::path::ConfigPath;
use crate::schema::Schema;
use crate::tree::{Command, ConfigTree};

/// How a loaded tree combines with the tree it is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Only add and overwrite; nothing already present is removed.
    Merge,
    /// Make the target equal to the loaded tree.
    #[default]
    Explicit,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Merge => f.write_str("merge"),
            LoadMode::Explicit => f.write_str("explicit"),
        }
    }
}

/// Applies a tree to a target tree.
pub trait Loader {
    /// Returns the commands that were applied.
    fn load(&self, target: &mut ConfigTree, tree: &ConfigTree, mode: LoadMode) -> Result<Vec<Command>>;
}

/// Loads by replaying `delete`/`set` commands against the target, the way
/// an operator at the CLI would.
#[derive(Debug, Clone, Copy)]
pub struct TreeLoader<'a> {
    schema: &'a dyn Schema,
}

impl<'a> TreeLoader<'a> {
    pub fn new(schema: &'a dyn Schema) -> Self {
        Self { schema }
    }
}

impl Loader for TreeLoader<'_> {
    fn load(&self, target: &mut ConfigTree, tree: &ConfigTree, mode: LoadMode) -> Result<Vec<Command>> {
        let commands = match mode {
            LoadMode::Explicit => diff_commands(target, tree, &ConfigPath::root()),
            LoadMode::Merge => {
                let mut merged = target.clone();
                merged.merge(tree)?;
                diff_commands(target, &merged, &ConfigPath::root())
            }
        };
        for command in &commands {
            target.apply(self.schema, command)?;
        }
        debug!(%mode, commands = commands.len(), "Loaded configuration tree");
        Ok(commands)
    }
}
