//! Subcommand implementations and the context they share.

use std::env;
use std::sync::Arc;

use cfgmgmt::archive::{Archive, ArchiveLayout, GzipCommand};
use cfgmgmt::commit::{Capabilities, CommitEngine, EngineSettings};
use cfgmgmt::constants::{ARCHIVE_DIR_NAME, CONFIG_JSON_NAME, RUNNING_CONFIG_NAME};
use cfgmgmt::session::{FileConfigSource, Session, SessionEnv};
use cfgmgmt::{Result, SystemClock};
use tracing::debug;

use crate::cli::PathArgs;

pub mod compare;
pub mod confirm;
pub mod hooks;
pub mod log;
pub mod rollback;

/// The session and engine every subcommand works with.
pub struct Context {
    pub session: Session,
    pub engine: CommitEngine,
    pub env: SessionEnv,
}

/// Command the commit-confirm timer runs when it expires.
fn revert_command() -> String {
    let program = env::current_exe()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| "config-mgmt".to_string());
    format!("{program} revert")
}

impl Context {
    pub fn open(paths: &PathArgs) -> Result<Self> {
        let env = SessionEnv {
            running_config: paths.runtime_dir.join(RUNNING_CONFIG_NAME),
            proposed_config: paths.proposed.clone(),
            json_mirror: paths.runtime_dir.join(CONFIG_JSON_NAME),
            archive_dir: paths.config_dir.join(ARCHIVE_DIR_NAME),
            reference: paths.reference.clone(),
        };
        let source = FileConfigSource::new(env.clone())?;
        let session = Session::new(Arc::new(source))?;

        let layout = ArchiveLayout::new(&paths.config_dir, &paths.runtime_dir, paths.tmp_dir.clone());
        let settings = EngineSettings::from_trees(session.working(), session.running());
        debug!(
            max_revisions = settings.max_revisions,
            locations = settings.effective_locations.len(),
            "Engine settings"
        );
        let engine = CommitEngine::new(
            Archive::new(layout, Arc::new(GzipCommand::default())),
            settings,
            Capabilities::system(revert_command()),
            Arc::new(SystemClock),
        );
        Ok(Self {
            session,
            engine,
            env,
        })
    }
}
