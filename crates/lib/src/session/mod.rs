//! Configuration sessions.
//!
//! A [`Session`] is the read/write handle one script invocation works
//! with. It holds the running tree, the proposed tree while a configure
//! session is open, and an edit level that prefixes every path handed to
//! it. Outside a configure session the proposed tree is absent and reads
//! fall back to the running tree.
//!
//! ```
//! use std::sync::Arc;
//! use cfgmgmt::ConfigPath;
//! use cfgmgmt::schema::ReferenceSchema;
//! use cfgmgmt::session::{Session, StaticConfigSource};
//! use cfgmgmt::tree::ConfigTree;
//!
//! let schema = Arc::new(ReferenceSchema::builder().leaf("system host-name").build());
//! let running = ConfigTree::parse("system {\n    host-name r1\n}\n").unwrap();
//! let mut session = Session::new(Arc::new(StaticConfigSource::new(running, schema))).unwrap();
//!
//! session.set_level(ConfigPath::parse("system").unwrap());
//! assert_eq!(session.value(&ConfigPath::parse("host-name").unwrap()), Some("r1"));
//! assert!(!session.in_session());
//! ```

use std::cell::OnceCell;
use std::env;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::Result;
use crate::constants::{ENV_EDIT_LEVEL, ENV_LEGACY_EDIT_LEVEL};
use crate::diff::ChangeDetector;
use crate::path::ConfigPath;
use crate::schema::Schema;
use crate::tree::{Command, ConfigTree};
use crate::view::{AcmeFileRewriter, DictOptions, DictView, PkiRewriter, Projector};

mod errors;
mod loader;
mod source;

pub use errors::SessionError;
pub use loader::{LoadMode, Loader, TreeLoader};
pub use source::{ConfigSource, FileConfigSource, SessionEnv, StaticConfigSource};

/// A callback run after a successful commit.
pub type Dependent = Box<dyn Fn()>;

/// Edit level from `EDIT_LEVEL`, falling back to `VYATTA_EDIT_LEVEL`.
pub fn level_from_env() -> Result<ConfigPath> {
    let raw = env::var(ENV_EDIT_LEVEL)
        .or_else(|_| env::var(ENV_LEGACY_EDIT_LEVEL))
        .unwrap_or_default();
    Ok(ConfigPath::from_slash_separated(&raw)?)
}

/// Read/write access to the running and proposed trees.
pub struct Session {
    source: Arc<dyn ConfigSource>,
    schema: Arc<dyn Schema>,
    running: ConfigTree,
    proposed: Option<ConfigTree>,
    level: ConfigPath,
    running_json: OnceCell<Map<String, Value>>,
    proposed_json: OnceCell<Map<String, Value>>,
    pki: Arc<dyn PkiRewriter>,
    dependents: Vec<Dependent>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("source", &self.source)
            .field("level", &self.level)
            .field("in_session", &self.in_session())
            .field("dependents", &self.dependents.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Loads both trees from `source`; the edit level comes from the
    /// environment.
    pub fn new(source: Arc<dyn ConfigSource>) -> Result<Self> {
        let (running, proposed) = source.load()?;
        let level = level_from_env()?;
        debug!(level = %level, in_session = proposed.is_some(), "Session opened");
        Ok(Self {
            schema: source.schema(),
            source,
            running,
            proposed,
            level,
            running_json: OnceCell::new(),
            proposed_json: OnceCell::new(),
            pki: Arc::new(AcmeFileRewriter::default()),
            dependents: Vec::new(),
        })
    }

    /// Replaces the rewriter used for `with_pki` projections.
    pub fn with_pki_rewriter(mut self, rewriter: Arc<dyn PkiRewriter>) -> Self {
        self.pki = rewriter;
        self
    }

    pub fn source(&self) -> &Arc<dyn ConfigSource> {
        &self.source
    }

    pub fn schema(&self) -> &dyn Schema {
        self.schema.as_ref()
    }

    pub fn level(&self) -> &ConfigPath {
        &self.level
    }

    pub fn set_level(&mut self, level: ConfigPath) {
        self.level = level;
    }

    pub fn running(&self) -> &ConfigTree {
        &self.running
    }

    pub fn proposed(&self) -> Option<&ConfigTree> {
        self.proposed.as_ref()
    }

    /// The proposed tree, or the running tree outside a configure session.
    pub fn working(&self) -> &ConfigTree {
        self.proposed.as_ref().unwrap_or(&self.running)
    }

    /// Mutable access to the proposed tree.
    pub fn proposed_mut(&mut self) -> std::result::Result<&mut ConfigTree, SessionError> {
        self.proposed_json.take();
        self.proposed
            .as_mut()
            .ok_or_else(|| SessionError::not_in_session("editing"))
    }

    fn tree(&self, effective: bool) -> &ConfigTree {
        if effective { &self.running } else { self.working() }
    }

    fn full_path(&self, path: &ConfigPath) -> ConfigPath {
        ConfigPath::concat(&self.level, path)
    }

    pub fn exists(&self, path: &ConfigPath) -> bool {
        self.working().exists(&self.full_path(path))
    }

    pub fn value(&self, path: &ConfigPath) -> Option<&str> {
        self.working().value(&self.full_path(path))
    }

    pub fn values(&self, path: &ConfigPath) -> &[String] {
        self.working().values(&self.full_path(path))
    }

    pub fn children(&self, path: &ConfigPath) -> Vec<&str> {
        self.working().children(&self.full_path(path))
    }

    pub fn exists_effective(&self, path: &ConfigPath) -> bool {
        self.running.exists(&self.full_path(path))
    }

    pub fn value_effective(&self, path: &ConfigPath) -> Option<&str> {
        self.running.value(&self.full_path(path))
    }

    pub fn values_effective(&self, path: &ConfigPath) -> &[String] {
        self.running.values(&self.full_path(path))
    }

    pub fn children_effective(&self, path: &ConfigPath) -> Vec<&str> {
        self.running.children(&self.full_path(path))
    }

    /// Text form of the subtree at `path`, or `default` when it is absent.
    pub fn show_config(&self, path: &ConfigPath, default: &str, effective: bool) -> String {
        let tree = self.tree(effective);
        let full = self.full_path(path);
        if !full.is_root() && tree.node_at(&full).is_none() {
            return default.to_string();
        }
        tree.to_text_at(&full)
    }

    fn root_json(&self, effective: bool) -> &Map<String, Value> {
        let cell = if effective || self.proposed.is_none() {
            &self.running_json
        } else {
            &self.proposed_json
        };
        cell.get_or_init(|| match self.tree(effective).to_json_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        })
    }

    fn projector(&self, effective: bool) -> Projector<'_> {
        Projector::with_root(self.tree(effective), self.root_json(effective), self.schema())
            .with_pki_rewriter(self.pki.as_ref())
    }

    /// Projects the subtree at `options.path` below the edit level.
    pub fn dict(&self, options: &DictOptions) -> Result<DictView> {
        let lpath = self.full_path(&options.path);
        Ok(self.projector(options.effective).dict(&lpath, options)?)
    }

    /// Only the defaults a projection with `options` would merge.
    pub fn defaults(&self, options: &DictOptions) -> Result<Map<String, Value>> {
        let lpath = self.full_path(&options.path);
        Ok(self.projector(options.effective).defaults(&lpath, options)?)
    }

    /// Merges defaults into `view` using the options it was built with.
    pub fn merge_defaults(&self, view: DictView, recursive: bool) -> Result<DictView> {
        let options = view.options().clone();
        let lpath = self.full_path(&options.path);
        Ok(self
            .projector(options.effective)
            .merge_defaults(&lpath, view, recursive)?)
    }

    pub fn is_tag(&self, path: &ConfigPath) -> bool {
        self.schema.is_tag(&self.full_path(path))
    }

    pub fn is_multi(&self, path: &ConfigPath) -> bool {
        self.schema.is_multi(&self.full_path(path))
    }

    pub fn is_leaf(&self, path: &ConfigPath) -> bool {
        self.schema.is_leaf(&self.full_path(path))
    }

    /// True iff a proposed tree exists and differs from the running tree.
    pub fn session_changed(&self) -> bool {
        self.proposed
            .as_ref()
            .is_some_and(|proposed| *proposed != self.running)
    }

    pub fn in_session(&self) -> bool {
        self.proposed.is_some()
    }

    /// Changes between the running and the working tree, at the edit level.
    pub fn diff(&self) -> ChangeDetector<'_> {
        ChangeDetector::new(&self.running, self.working(), self.schema()).with_level(self.level.clone())
    }

    /// Registers a callback to run after the next successful commit.
    pub fn add_dependent(&mut self, dependent: impl Fn() + 'static) {
        self.dependents.push(Box::new(dependent));
    }

    pub fn dependents(&self) -> usize {
        self.dependents.len()
    }

    /// Runs the registered callbacks in registration order, then forgets
    /// them. Returns how many ran.
    pub fn run_dependents(&mut self) -> usize {
        let dependents = std::mem::take(&mut self.dependents);
        for dependent in &dependents {
            dependent();
        }
        debug!(count = dependents.len(), "Ran commit dependents");
        dependents.len()
    }

    /// Applies `tree` to the proposed tree as edit commands.
    pub fn load(&mut self, tree: &ConfigTree, mode: LoadMode) -> Result<Vec<Command>> {
        let schema = Arc::clone(&self.schema);
        let proposed = self.proposed_mut()?;
        TreeLoader::new(schema.as_ref()).load(proposed, tree, mode)
    }

    /// Makes the proposed tree the running tree after a commit.
    pub fn promote(&mut self) {
        match &self.proposed {
            Some(proposed) => {
                self.running = proposed.clone();
                self.running_json.take();
            }
            None => warn!("No proposed configuration to promote"),
        }
    }
}
