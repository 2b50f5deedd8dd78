//! Narrow interfaces to the system services the commit engine drives.
//!
//! The process-backed implementations live in [`super::process`]; the
//! in-memory ones in [`crate::testing`].

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use super::CommitError;
use crate::tree::ConfigTree;

/// The one-shot timer that reverts an unconfirmed commit.
pub trait ConfirmTimer: Send + Sync + Debug {
    fn is_armed(&self) -> bool;

    /// Arms the timer to run the revert action after `minutes`.
    fn arm(&self, minutes: u32) -> Result<(), CommitError>;

    fn disarm(&self) -> Result<(), CommitError>;
}

/// Tells logged-in users that a commit is waiting for confirmation.
pub trait Notifier: Send + Sync + Debug {
    fn start(&self, minutes: u32) -> Result<(), CommitError>;

    fn stop(&self) -> Result<(), CommitError>;
}

pub trait Rebooter: Send + Sync + Debug {
    fn reboot(&self) -> Result<(), CommitError>;
}

/// Copies a file to a remote archive location.
pub trait Uploader: Send + Sync + Debug {
    fn upload(&self, file: &Path, destination: &str, source_address: Option<&str>) -> Result<(), CommitError>;
}

/// Asks the operator a yes/no question.
pub trait Prompt: Send + Sync + Debug {
    fn ask_yes_no(&self, question: &str, default: bool) -> bool;
}

/// Hands files over to the configuration group.
pub trait FileOwnership: Send + Sync + Debug {
    fn set_group(&self, path: &Path, group: &str) -> Result<(), CommitError>;
}

/// Accepts or rejects a proposed configuration before it is committed.
pub trait Validator: Send + Sync + Debug {
    /// Returns one message per problem on rejection.
    fn validate(&self, proposed: &ConfigTree) -> Result<(), Vec<String>>;
}

/// Validator that accepts every configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, _proposed: &ConfigTree) -> Result<(), Vec<String>> {
        Ok(())
    }
}

/// The full set of services a [`CommitEngine`](super::CommitEngine) uses.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub timer: Arc<dyn ConfirmTimer>,
    pub notifier: Arc<dyn Notifier>,
    pub rebooter: Arc<dyn Rebooter>,
    pub uploader: Arc<dyn Uploader>,
    pub prompt: Arc<dyn Prompt>,
    pub ownership: Arc<dyn FileOwnership>,
    pub validator: Arc<dyn Validator>,
}

impl Capabilities {
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }
}
