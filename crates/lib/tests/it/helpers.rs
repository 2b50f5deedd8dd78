use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use cfgmgmt::archive::{Archive, ArchiveLayout, Compressor};
use cfgmgmt::commit::{CommitEngine, CommitMeta, EngineSettings};
use cfgmgmt::schema::{ReferenceSchema, Schema};
use cfgmgmt::session::{FileConfigSource, Session, SessionEnv, StaticConfigSource};
use cfgmgmt::testing::{FakeSystem, ReversingCompressor};
use cfgmgmt::tree::ConfigTree;
use cfgmgmt::{ConfigPath, FixedClock};
use tempfile::TempDir;

/// Start of every test clock: 2024-01-01 00:00:00 UTC.
pub const EPOCH: i64 = 1_704_067_200;

/// Schema covering every node the tests touch.
pub fn schema() -> Arc<dyn Schema> {
    Arc::new(
        ReferenceSchema::builder()
            .leaf("system host-name")
            .leaf("system domain-name")
            .multi("system name-server")
            .tag("interfaces ethernet")
            .multi("interfaces ethernet address")
            .leaf("interfaces ethernet description")
            .valueless("interfaces ethernet disable")
            .default_value("interfaces ethernet mtu", "1500")
            .leaf("service ssh port")
            .default_value("service ssh port", "22")
            .leaf("service ssh listen-address")
            .leaf("system config-management commit-revisions")
            .multi("system config-management commit-archive location")
            .build(),
    )
}

pub fn parse(text: &str) -> ConfigTree {
    ConfigTree::parse_with_schema(text, schema().as_ref()).unwrap()
}

pub fn path(words: &str) -> ConfigPath {
    ConfigPath::from_words(words)
}

/// Config text with just a host name.
pub fn host(name: &str) -> String {
    format!("system {{\n    host-name {name}\n}}\n")
}

/// A temp directory laid out like a router, with an engine over fake
/// system services.
pub struct Harness {
    pub dir: TempDir,
    pub system: FakeSystem,
    pub clock: Arc<FixedClock>,
    pub compressor: Arc<dyn Compressor>,
    pub engine: CommitEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self::build(settings, Arc::new(ReversingCompressor))
    }

    pub fn with_compressor(compressor: Arc<dyn Compressor>) -> Self {
        Self::build(EngineSettings::default(), compressor)
    }

    fn build(settings: EngineSettings, compressor: Arc<dyn Compressor>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::rooted(dir.path());
        for sub in ["config", "run", "tmp"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        let system = FakeSystem::new();
        let clock = Arc::new(FixedClock::new(EPOCH as u64 * 1000));
        let engine = CommitEngine::new(
            Archive::new(layout, Arc::clone(&compressor)),
            settings,
            system.capabilities(),
            clock.clone(),
        );
        Self {
            dir,
            system,
            clock,
            compressor,
            engine,
        }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        self.engine.archive().layout()
    }

    /// Session over in-memory trees.
    pub fn session(&self, running: &str, proposed: Option<&str>) -> Session {
        let mut source = StaticConfigSource::new(parse(running), schema());
        if let Some(proposed) = proposed {
            source = source.with_proposed(parse(proposed));
        }
        let mut session = Session::new(Arc::new(source)).unwrap();
        session.set_level(ConfigPath::root());
        session
    }

    /// Files a [`FileConfigSource`] reads inside the harness directory.
    pub fn session_env(&self, proposed: bool) -> SessionEnv {
        let run = self.dir.path().join("run");
        SessionEnv {
            running_config: run.join("running.boot"),
            proposed_config: proposed.then(|| run.join("proposed.boot")),
            json_mirror: self.layout().json_mirror.clone(),
            archive_dir: self.layout().archive_dir.clone(),
            reference: None,
        }
    }

    pub fn file_session(&self, env: SessionEnv) -> Session {
        let source = FileConfigSource::with_schema(env, schema());
        let mut session = Session::new(Arc::new(source)).unwrap();
        session.set_level(ConfigPath::root());
        session
    }

    /// Commits `text` on top of an empty running tree.
    pub fn commit(&self, text: &str) {
        let mut session = self.session("", Some(text));
        self.engine
            .commit(&mut session, &CommitMeta::new("vyos", "cli", "commit"))
            .unwrap();
        self.clock.advance_secs(60);
    }

    pub fn read(&self, path: &PathBuf) -> String {
        fs::read_to_string(path).unwrap()
    }

    /// Decompressed content of gzip revision `rev`.
    pub fn revision_bytes(&self, rev: usize) -> Vec<u8> {
        let packed = fs::read(self.layout().revision(rev)).unwrap();
        self.compressor.decompress(&packed).unwrap()
    }
}
