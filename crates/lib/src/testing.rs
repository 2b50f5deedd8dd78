//! In-memory stand-ins for the system services of the commit engine.
//!
//! [`FakeSystem`] implements every capability trait and records what was
//! asked of it, so commit flows can run in a temp directory without
//! timers, reboots or network access.
//!
//! ```
//! use cfgmgmt::commit::ConfirmTimer;
//! use cfgmgmt::testing::FakeSystem;
//!
//! let system = FakeSystem::new();
//! let caps = system.capabilities();
//! caps.timer.arm(10).unwrap();
//! assert!(system.state().armed == Some(10));
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::archive::Compressor;
use crate::commit::{
    Capabilities, CommitError, ConfirmTimer, FileOwnership, Notifier, Prompt, Rebooter, Uploader,
    Validator,
};
use crate::tree::ConfigTree;

const REVERSED_MAGIC: &[u8] = b"REV\0";

/// Stores data reversed behind a magic header; anything without the
/// header fails to decompress.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReversingCompressor;

impl Compressor for ReversingCompressor {
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = REVERSED_MAGIC.to_vec();
        out.extend(data.iter().rev());
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let body = data
            .strip_prefix(REVERSED_MAGIC)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "not in reversed format"))?;
        Ok(body.iter().rev().copied().collect())
    }
}

/// A [`ReversingCompressor`] whose first `failures` compressions fail.
#[derive(Debug, Default)]
pub struct FlakyCompressor {
    failures: AtomicUsize,
}

impl FlakyCompressor {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
        }
    }
}

impl Compressor for FlakyCompressor {
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if failed.is_ok() {
            return Err(io::Error::other("no space left on device"));
        }
        ReversingCompressor.compress(data)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        ReversingCompressor.decompress(data)
    }
}

/// One recorded upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file: PathBuf,
    pub destination: String,
    pub source_address: Option<String>,
}

/// Everything a [`FakeSystem`] was asked to do.
#[derive(Debug, Default)]
pub struct FakeState {
    /// Minutes of the armed commit-confirm timer.
    pub armed: Option<u32>,
    pub notifier_running: bool,
    pub reboots: usize,
    pub uploads: Vec<Upload>,
    /// Questions asked through the prompt.
    pub questions: Vec<String>,
    /// Answer to give; `None` takes the question's default.
    pub answer: Option<bool>,
    /// Files handed to the configuration group.
    pub grouped: Vec<PathBuf>,
    pub fail_uploads: bool,
    /// Problems the validator reports; empty accepts.
    pub rejections: Vec<String>,
}

/// Shared-state fake implementing every capability.
#[derive(Debug, Clone, Default)]
pub struct FakeSystem {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capabilities that all record into this system.
    pub fn capabilities(&self) -> Capabilities {
        let this = Arc::new(self.clone());
        Capabilities {
            timer: this.clone(),
            notifier: this.clone(),
            rebooter: this.clone(),
            uploader: this.clone(),
            prompt: this.clone(),
            ownership: this.clone(),
            validator: this,
        }
    }

    pub fn answer(&self, answer: bool) -> &Self {
        self.state().answer = Some(answer);
        self
    }

    pub fn fail_uploads(&self) -> &Self {
        self.state().fail_uploads = true;
        self
    }

    pub fn reject(&self, problem: impl Into<String>) -> &Self {
        self.state().rejections.push(problem.into());
        self
    }
}

impl ConfirmTimer for FakeSystem {
    fn is_armed(&self) -> bool {
        self.state().armed.is_some()
    }

    fn arm(&self, minutes: u32) -> Result<(), CommitError> {
        self.state().armed = Some(minutes);
        Ok(())
    }

    fn disarm(&self) -> Result<(), CommitError> {
        self.state().armed = None;
        Ok(())
    }
}

impl Notifier for FakeSystem {
    fn start(&self, _minutes: u32) -> Result<(), CommitError> {
        self.state().notifier_running = true;
        Ok(())
    }

    fn stop(&self) -> Result<(), CommitError> {
        self.state().notifier_running = false;
        Ok(())
    }
}

impl Rebooter for FakeSystem {
    fn reboot(&self) -> Result<(), CommitError> {
        self.state().reboots += 1;
        Ok(())
    }
}

impl Uploader for FakeSystem {
    fn upload(&self, file: &Path, destination: &str, source_address: Option<&str>) -> Result<(), CommitError> {
        let mut state = self.state();
        if state.fail_uploads {
            return Err(CommitError::subprocess(format!("upload {destination}"), "connection refused"));
        }
        state.uploads.push(Upload {
            file: file.to_path_buf(),
            destination: destination.to_string(),
            source_address: source_address.map(str::to_string),
        });
        Ok(())
    }
}

impl Prompt for FakeSystem {
    fn ask_yes_no(&self, question: &str, default: bool) -> bool {
        let mut state = self.state();
        state.questions.push(question.to_string());
        state.answer.unwrap_or(default)
    }
}

impl FileOwnership for FakeSystem {
    fn set_group(&self, path: &Path, _group: &str) -> Result<(), CommitError> {
        self.state().grouped.push(path.to_path_buf());
        Ok(())
    }
}

impl Validator for FakeSystem {
    fn validate(&self, _proposed: &ConfigTree) -> Result<(), Vec<String>> {
        let state = self.state();
        if state.rejections.is_empty() {
            Ok(())
        } else {
            Err(state.rejections.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversing_compressor() {
        let packed = ReversingCompressor.compress(b"abc").unwrap();
        assert_eq!(packed, b"REV\0cba");
        assert_eq!(ReversingCompressor.decompress(&packed).unwrap(), b"abc");
        assert!(ReversingCompressor.decompress(b"abc").is_err());
    }

    #[test]
    fn test_flaky_compressor_recovers() {
        let flaky = FlakyCompressor::failing(2);
        assert!(flaky.compress(b"abc").is_err());
        assert!(flaky.compress(b"abc").is_err());
        let packed = flaky.compress(b"abc").unwrap();
        assert_eq!(flaky.decompress(&packed).unwrap(), b"abc");
    }

    #[test]
    fn test_fake_system_records() {
        let system = FakeSystem::new();
        let caps = system.capabilities();
        caps.notifier.start(5).unwrap();
        caps.rebooter.reboot().unwrap();
        assert!(caps.prompt.ask_yes_no("Proceed ?", true));
        system.answer(false);
        assert!(!caps.prompt.ask_yes_no("Proceed ?", true));
        system.reject("bad");
        assert_eq!(caps.validator.validate(&ConfigTree::new()), Err(vec!["bad".to_string()]));

        let state = system.state();
        assert!(state.notifier_running);
        assert_eq!(state.reboots, 1);
        assert_eq!(state.questions.len(), 2);
    }
}
