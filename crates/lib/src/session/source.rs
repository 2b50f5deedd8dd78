//! Where sessions get their trees from.

use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::SessionError;
use crate::Result;
use crate::archive::{ARCHIVE_MODE, write_atomic};
use crate::constants::{
    ARCHIVE_DIR_NAME, CONFIG_DIR, CONFIG_JSON_NAME, RUNNING_CONFIG_NAME, RUNTIME_DIR,
};
use crate::path::ConfigPath;
use crate::schema::{ReferenceSchema, Schema};
use crate::tree::ConfigTree;

/// Provider of the running and proposed trees.
pub trait ConfigSource: Send + Sync + Debug {
    /// Reads both trees at once. The proposed tree is `None` outside a
    /// configure session.
    fn load(&self) -> Result<(ConfigTree, Option<ConfigTree>)>;

    /// The schema trees from this source are interpreted with.
    fn schema(&self) -> Arc<dyn Schema>;

    fn in_session(&self) -> bool;

    /// Replaces the running configuration with `tree`.
    fn store_running(&self, tree: &ConfigTree) -> Result<()>;

    /// Writes the text form of `tree` to `path`, replacing it atomically.
    fn save(&self, tree: &ConfigTree, path: &Path) -> Result<()> {
        write_atomic(path, tree.to_text().as_bytes(), ARCHIVE_MODE)?;
        Ok(())
    }

    /// True when the proposed tree differs from the running tree.
    fn session_changed(&self) -> Result<bool> {
        let (running, proposed) = self.load()?;
        Ok(proposed.is_some_and(|proposed| proposed != running))
    }

    fn is_tag(&self, path: &ConfigPath) -> bool {
        self.schema().is_tag(path)
    }

    fn is_multi(&self, path: &ConfigPath) -> bool {
        self.schema().is_multi(path)
    }

    fn is_leaf(&self, path: &ConfigPath) -> bool {
        self.schema().is_leaf(path)
    }
}

/// File locations a [`FileConfigSource`] reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnv {
    /// Text form of the running configuration.
    pub running_config: PathBuf,
    /// Text form of the proposed configuration, inside a configure session.
    pub proposed_config: Option<PathBuf>,
    /// JSON projection of the running configuration.
    pub json_mirror: PathBuf,
    pub archive_dir: PathBuf,
    /// Reference schema in JSON form; no schema means kinds are inferred
    /// from the text syntax.
    pub reference: Option<PathBuf>,
}

impl Default for SessionEnv {
    fn default() -> Self {
        let runtime = Path::new(RUNTIME_DIR);
        Self {
            running_config: runtime.join(RUNNING_CONFIG_NAME),
            proposed_config: None,
            json_mirror: runtime.join(CONFIG_JSON_NAME),
            archive_dir: Path::new(CONFIG_DIR).join(ARCHIVE_DIR_NAME),
            reference: None,
        }
    }
}

/// Reads configuration text files from disk.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    env: SessionEnv,
    schema: Arc<dyn Schema>,
}

impl FileConfigSource {
    /// Loads the reference schema named by `env`, if any.
    pub fn new(env: SessionEnv) -> Result<Self> {
        let schema: Arc<dyn Schema> = match &env.reference {
            Some(path) => Arc::new(ReferenceSchema::load(path)?),
            None => Arc::new(ReferenceSchema::empty()),
        };
        Ok(Self { env, schema })
    }

    pub fn with_schema(env: SessionEnv, schema: Arc<dyn Schema>) -> Self {
        Self { env, schema }
    }

    pub fn env(&self) -> &SessionEnv {
        &self.env
    }

    fn read_tree(&self, path: &Path) -> Result<Option<ConfigTree>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::SourceUnavailable {
                    path: path.to_path_buf(),
                    source,
                }
                .into());
            }
        };
        Ok(Some(ConfigTree::parse_with_schema(&text, self.schema.as_ref())?))
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<(ConfigTree, Option<ConfigTree>)> {
        let running = self.read_tree(&self.env.running_config)?.unwrap_or_default();
        let proposed = match &self.env.proposed_config {
            Some(path) => self.read_tree(path)?,
            None => None,
        };
        debug!(
            running = %self.env.running_config.display(),
            in_session = proposed.is_some(),
            "Loaded configuration"
        );
        Ok((running, proposed))
    }

    fn schema(&self) -> Arc<dyn Schema> {
        Arc::clone(&self.schema)
    }

    fn in_session(&self) -> bool {
        self.env
            .proposed_config
            .as_ref()
            .is_some_and(|path| path.is_file())
    }

    fn store_running(&self, tree: &ConfigTree) -> Result<()> {
        self.save(tree, &self.env.running_config)?;
        debug!(path = %self.env.running_config.display(), "Running configuration replaced");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Trees {
    running: ConfigTree,
    proposed: Option<ConfigTree>,
}

/// Trees held in memory, for embedding and tests.
///
/// Clones share the same trees, so a committed running tree is visible
/// through every handle.
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    trees: Arc<Mutex<Trees>>,
    schema: Arc<dyn Schema>,
}

impl StaticConfigSource {
    pub fn new(running: ConfigTree, schema: Arc<dyn Schema>) -> Self {
        Self {
            trees: Arc::new(Mutex::new(Trees {
                running,
                proposed: None,
            })),
            schema,
        }
    }

    /// Opens a configure session editing `proposed`.
    pub fn with_proposed(self, proposed: ConfigTree) -> Self {
        self.trees().proposed = Some(proposed);
        self
    }

    fn trees(&self) -> MutexGuard<'_, Trees> {
        self.trees.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current running tree.
    pub fn running(&self) -> ConfigTree {
        self.trees().running.clone()
    }
}

impl ConfigSource for StaticConfigSource {
    fn load(&self) -> Result<(ConfigTree, Option<ConfigTree>)> {
        let trees = self.trees();
        Ok((trees.running.clone(), trees.proposed.clone()))
    }

    fn schema(&self) -> Arc<dyn Schema> {
        Arc::clone(&self.schema)
    }

    fn in_session(&self) -> bool {
        self.trees().proposed.is_some()
    }

    fn store_running(&self, tree: &ConfigTree) -> Result<()> {
        let mut trees = self.trees();
        trees.running = tree.clone();
        if trees.proposed.is_some() {
            trees.proposed = Some(tree.clone());
        }
        Ok(())
    }
}
