//! The revision archive.
//!
//! Every commit that changes the configuration leaves a copy of the saved
//! text in `<archive_dir>/config.boot` and rotates it into gzip copies:
//!
//! ```text
//! <archive_dir>/config.boot          most recent committed config
//! <archive_dir>/config.boot.<N>.gz   revision N, 0 is the most recent
//! <archive_dir>/commits              commit log, newest line first
//! ```
//!
//! Revision N of the archive always corresponds to line N of the commit log.
//! All files are replaced through a temp file in the same directory and a
//! rename, so a reader never sees a partially written file.

use std::fs::{self, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::constants::{
    ARCHIVE_DIR_NAME, COMMIT_LOG_NAME, CONFIG_DIR, CONFIG_FILE_NAME, CONFIG_GROUP, CONFIG_JSON_NAME,
    PREROLLBACK_NAME, ROLLBACK_NAME, ROTATION_CONF_NAME, ROTATION_STATE_NAME, RUNTIME_DIR,
    TMP_DIR, TMP_LOG_ENTRY_NAME, TMP_RUNNING_NAME,
};
use crate::schema::Schema;
use crate::tree::ConfigTree;

mod compress;
mod errors;
pub mod log;

pub use compress::{Compressor, GzipCommand};
pub use errors::ArchiveError;
pub use log::{CommitLog, LogEntry};

/// Mode of archived configs and the commit log (umask 0o113).
pub const ARCHIVE_MODE: u32 = 0o664;

/// Mode of the rotation policy file.
const ROTATION_CONF_MODE: u32 = 0o644;

/// Replaces `path` with `contents`.
///
/// The data goes to a temp file in the target directory which is renamed
/// over `path`; on failure the previous file is left untouched.
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<(), ArchiveError> {
    let io_err = |source: std::io::Error| ArchiveError::io(path, source);
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    fs::set_permissions(tmp.path(), Permissions::from_mode(mode)).map_err(io_err)?;
    tmp.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}

/// Locations of every file the commit machinery reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    /// The saved boot configuration.
    pub config_file: PathBuf,
    pub archive_dir: PathBuf,
    /// JSON projection of the running configuration.
    pub json_mirror: PathBuf,
    /// Directory for scratch files and the pending commit entry.
    pub tmp_dir: PathBuf,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self::new(CONFIG_DIR, RUNTIME_DIR, TMP_DIR)
    }
}

impl ArchiveLayout {
    /// Layout below a config directory, a runtime directory and a temp
    /// directory.
    pub fn new(
        config_dir: impl AsRef<Path>,
        runtime_dir: impl AsRef<Path>,
        tmp_dir: impl Into<PathBuf>,
    ) -> Self {
        let config_dir = config_dir.as_ref();
        Self {
            config_file: config_dir.join(CONFIG_FILE_NAME),
            archive_dir: config_dir.join(ARCHIVE_DIR_NAME),
            json_mirror: runtime_dir.as_ref().join(CONFIG_JSON_NAME),
            tmp_dir: tmp_dir.into(),
        }
    }

    /// The default layout relocated below `root`, used for staging trees.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("config"), root.join("run"), root.join("tmp"))
    }

    /// Most recent committed config inside the archive.
    pub fn archive_config(&self) -> PathBuf {
        self.archive_dir.join(CONFIG_FILE_NAME)
    }

    pub fn revision(&self, rev: usize) -> PathBuf {
        self.archive_dir.join(format!("{CONFIG_FILE_NAME}.{rev}.gz"))
    }

    pub fn commit_log(&self) -> PathBuf {
        self.archive_dir.join(COMMIT_LOG_NAME)
    }

    pub fn rotation_conf(&self) -> PathBuf {
        self.archive_dir.join(ROTATION_CONF_NAME)
    }

    pub fn rotation_state(&self) -> PathBuf {
        self.archive_dir.join(ROTATION_STATE_NAME)
    }

    pub fn rollback(&self) -> PathBuf {
        self.archive_dir.join(ROLLBACK_NAME)
    }

    pub fn prerollback(&self) -> PathBuf {
        self.archive_dir.join(PREROLLBACK_NAME)
    }

    /// Log entry of a commit waiting for `confirm`.
    pub fn pending_entry(&self) -> PathBuf {
        self.tmp_dir.join(TMP_LOG_ENTRY_NAME)
    }

    /// Scratch dump of the running config.
    pub fn scratch_running(&self) -> PathBuf {
        self.tmp_dir.join(TMP_RUNNING_NAME)
    }

    /// Parses `config.boot.<N>.gz` back into `N`.
    fn revision_index(name: &str) -> Option<usize> {
        name.strip_prefix(CONFIG_FILE_NAME)?
            .strip_prefix('.')?
            .strip_suffix(".gz")?
            .parse()
            .ok()
    }
}

/// Read and write access to the revision archive.
#[derive(Debug, Clone)]
pub struct Archive {
    layout: ArchiveLayout,
    compressor: Arc<dyn Compressor>,
}

impl Archive {
    pub fn new(layout: ArchiveLayout, compressor: Arc<dyn Compressor>) -> Self {
        Self { layout, compressor }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    pub fn log(&self) -> CommitLog {
        CommitLog::new(self.layout.commit_log())
    }

    /// Creates the archive directory if needed.
    pub fn ensure_dir(&self) -> Result<(), ArchiveError> {
        fs::create_dir_all(&self.layout.archive_dir)
            .map_err(|err| ArchiveError::io(&self.layout.archive_dir, err))
    }

    /// Number of revisions, as recorded by the commit log.
    pub fn num_revisions(&self) -> Result<usize, ArchiveError> {
        self.log().len()
    }

    /// Checks `0 <= rev < num_revisions`.
    pub fn check_revision(&self, rev: usize) -> Result<(), ArchiveError> {
        let available = self.num_revisions()?;
        if rev >= available {
            return Err(ArchiveError::MissingRevision { rev, available });
        }
        Ok(())
    }

    /// Decompressed text of revision `rev`.
    pub fn read_revision(&self, rev: usize) -> Result<String, ArchiveError> {
        self.check_revision(rev)?;
        let path = self.layout.revision(rev);
        let unavailable = |reason: String| ArchiveError::Unavailable {
            path: path.clone(),
            reason,
        };
        let packed = fs::read(&path).map_err(|err| unavailable(err.to_string()))?;
        let text = self
            .compressor
            .decompress(&packed)
            .map_err(|err| unavailable(err.to_string()))?;
        String::from_utf8(text).map_err(|err| unavailable(err.to_string()))
    }

    /// Revision `rev` parsed into a tree.
    pub fn revision_tree(&self, rev: usize, schema: &dyn Schema) -> crate::Result<ConfigTree> {
        let text = self.read_revision(rev)?;
        Ok(ConfigTree::parse_with_schema(&text, schema)?)
    }

    /// Text of the most recent committed config, if any.
    pub fn archived_text(&self) -> Result<Option<String>, ArchiveError> {
        let path = self.layout.archive_config();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ArchiveError::io(path, err)),
        }
    }

    /// Records `text` as a new revision logged by `entry`, keeping at most
    /// `max` revisions.
    ///
    /// Returns `false` without touching the archive when `text` is
    /// identical to the last archived config. The revision and its log line
    /// are written before the archived config, so a failure part way leaves
    /// the old config in place and the next attempt archives again.
    pub fn archive_text(&self, text: &str, entry: &LogEntry, max: usize) -> Result<bool, ArchiveError> {
        if max == 0 {
            return Ok(false);
        }
        if self.archived_text()?.as_deref() == Some(text) {
            debug!("Config unchanged since last archived revision");
            return Ok(false);
        }
        let current = self.layout.archive_config();
        let packed = self
            .compressor
            .compress(text.as_bytes())
            .map_err(|err| ArchiveError::io(&current, err))?;

        self.ensure_dir()?;
        self.rotate(&packed, max)?;
        self.log().prepend(entry, max)?;
        write_atomic(&current, text.as_bytes(), ARCHIVE_MODE)?;
        Ok(true)
    }

    /// Shifts the gzip copies up by one and stores `packed` as revision 0.
    fn rotate(&self, packed: &[u8], max: usize) -> Result<(), ArchiveError> {
        self.prune(max - 1)?;
        for rev in (0..max - 1).rev() {
            let from = self.layout.revision(rev);
            if from.exists() {
                let to = self.layout.revision(rev + 1);
                fs::rename(&from, &to).map_err(|err| ArchiveError::io(&from, err))?;
            }
        }
        write_atomic(&self.layout.revision(0), packed, ARCHIVE_MODE)?;
        debug!(max_revisions = max, "Archive rotated");
        Ok(())
    }

    /// Removes gzip copies numbered `keep` and above.
    fn prune(&self, keep: usize) -> Result<(), ArchiveError> {
        let dir = &self.layout.archive_dir;
        let entries = fs::read_dir(dir).map_err(|err| ArchiveError::io(dir, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| ArchiveError::io(dir, err))?;
            let name = entry.file_name();
            let stale = name
                .to_str()
                .and_then(ArchiveLayout::revision_index)
                .is_some_and(|rev| rev >= keep);
            if stale {
                let path = entry.path();
                fs::remove_file(&path).map_err(|err| ArchiveError::io(&path, err))?;
            }
        }
        Ok(())
    }

    /// Writes the logrotate-style policy describing the rotation.
    pub fn write_rotation_conf(&self, max: usize) -> Result<(), ArchiveError> {
        let conf = format!(
            "{} {{\n    su root {CONFIG_GROUP}\n    rotate {max}\n    start 0\n    compress\n    copy\n}}\n",
            self.layout.archive_config().display()
        );
        self.ensure_dir()?;
        write_atomic(&self.layout.rotation_conf(), conf.as_bytes(), ROTATION_CONF_MODE)
    }

    /// Prepares the boot config for a reboot into revision `rev`.
    ///
    /// The current archived config is kept as the pre-rollback snapshot,
    /// the revision is written to the rollback file and then over the saved
    /// boot config. Nothing is written when the revision cannot be read.
    pub fn stage_rollback(&self, rev: usize) -> Result<String, ArchiveError> {
        let text = self.read_revision(rev)?;
        let current = self.layout.archive_config();
        let snapshot = fs::read(&current).map_err(|err| ArchiveError::io(&current, err))?;
        write_atomic(&self.layout.prerollback(), &snapshot, ARCHIVE_MODE)?;
        write_atomic(&self.layout.rollback(), text.as_bytes(), ARCHIVE_MODE)?;
        write_atomic(&self.layout.config_file, text.as_bytes(), ARCHIVE_MODE)?;
        info!(rev, "Rollback staged");
        Ok(text)
    }
}
