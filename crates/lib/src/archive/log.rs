//! The commit log.
//!
//! One line per archived revision, newest first:
//!
//! ```text
//! |<unix_ts>|<user>|<via>|<comment>|
//! ```
//!
//! `|` is the field delimiter, so a pipe inside the comment is stored as
//! `%%`. This module is the only place that knows about the escape.
//! Lines that do not split into exactly four fields are skipped with a
//! warning.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ArchiveError, write_atomic};
use crate::constants::DEFAULT_COMMIT_COMMENT;

/// Mode of the commit log and pending entry files.
const LOG_MODE: u32 = 0o664;

/// A single commit log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub user: String,
    /// Channel the commit came through, e.g. `cli` or `init`.
    pub via: String,
    pub comment: String,
}

impl LogEntry {
    pub fn new(
        timestamp: i64,
        user: impl Into<String>,
        via: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            user: user.into(),
            via: via.into(),
            comment: comment.into(),
        }
    }

    /// Whether the comment is the one recorded when none was given.
    pub fn has_default_comment(&self) -> bool {
        self.comment == DEFAULT_COMMIT_COMMENT
    }

    /// Encodes the entry as a newline-terminated log line.
    pub fn encode(&self) -> String {
        format!(
            "|{}|{}|{}|{}|\n",
            self.timestamp,
            self.user,
            self.via,
            self.comment.replace('|', "%%")
        )
    }

    /// Decodes a log line, with or without its newline.
    ///
    /// Returns `None` for anything that is not four `|`-delimited fields
    /// with a numeric timestamp.
    pub fn decode(line: &str) -> Option<Self> {
        let body = line.trim().strip_prefix('|')?.strip_suffix('|')?;
        let fields: Vec<&str> = body.split('|').collect();
        let [timestamp, user, via, comment] = fields.as_slice() else {
            return None;
        };
        Some(Self {
            timestamp: timestamp.parse().ok()?,
            user: user.to_string(),
            via: via.to_string(),
            comment: comment.replace("%%", "|"),
        })
    }
}

/// The `commits` file of the archive.
#[derive(Debug, Clone)]
pub struct CommitLog {
    path: PathBuf,
}

impl CommitLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Raw lines of the log; a missing file is an empty log.
    pub fn lines(&self) -> Result<Vec<String>, ArchiveError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(ArchiveError::io(&self.path, err)),
        }
    }

    /// Number of lines in the log, which is also the number of revisions.
    pub fn len(&self) -> Result<usize, ArchiveError> {
        Ok(self.lines()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ArchiveError> {
        Ok(self.len()? == 0)
    }

    /// All well-formed entries, newest first.
    pub fn entries(&self) -> Result<Vec<LogEntry>, ArchiveError> {
        let lines = self.lines()?;
        let mut entries = Vec::with_capacity(lines.len());
        for line in lines {
            match LogEntry::decode(&line) {
                Some(entry) => entries.push(entry),
                None => warn!(line = %line, "Invalid log format"),
            }
        }
        Ok(entries)
    }

    /// Puts `entry` at the head of the log, keeping at most `max` lines.
    pub fn prepend(&self, entry: &LogEntry, max: usize) -> Result<(), ArchiveError> {
        let mut lines = self.lines()?;
        lines.insert(0, entry.encode().trim_end().to_string());
        lines.truncate(max);
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        write_atomic(&self.path, text.as_bytes(), LOG_MODE)?;
        debug!(path = %self.path.display(), lines = lines.len(), "Commit log updated");
        Ok(())
    }
}

/// Writes the entry of a commit that waits for confirmation.
pub fn write_pending(path: &Path, entry: &LogEntry) -> Result<(), ArchiveError> {
    write_atomic(path, entry.encode().as_bytes(), LOG_MODE)
}

/// Reads and removes the entry written by [`write_pending`].
///
/// A missing or malformed file is logged and yields `None`.
pub fn take_pending(path: &Path) -> Option<LogEntry> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Pending commit entry unavailable");
            return None;
        }
    };
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %err, "Unable to remove pending commit entry");
    }
    let entry = LogEntry::decode(&text);
    if entry.is_none() {
        warn!(line = %text.trim(), "Invalid log format");
    }
    entry
}
