//! CLI argument definitions for the config-mgmt binary.

use std::path::PathBuf;

use cfgmgmt::constants::{CONFIG_DIR, DEFAULT_CONFIRM_MINUTES, RUNTIME_DIR, TMP_DIR};
use clap::{Parser, Subcommand};

/// Commit archive, commit-confirm and rollback for the router configuration
#[derive(Parser, Debug)]
#[command(name = "config-mgmt")]
#[command(about = "Configuration revision management: confirm, rollback, compare")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Print machine-readable JSON where supported
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the configuration files live
#[derive(clap::Args, Debug, Clone)]
pub struct PathArgs {
    /// Directory of the saved boot config and the archive
    #[arg(long, global = true, default_value = CONFIG_DIR, env = "CONFIG_MGMT_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Directory of the running config and its JSON projection
    #[arg(long, global = true, default_value = RUNTIME_DIR, env = "CONFIG_MGMT_RUNTIME_DIR")]
    pub runtime_dir: PathBuf,

    /// Directory for scratch files and the pending commit entry
    #[arg(long, global = true, default_value = TMP_DIR, env = "CONFIG_MGMT_TMP_DIR")]
    pub tmp_dir: PathBuf,

    /// Proposed config of the open configure session
    #[arg(long, global = true, env = "CONFIG_MGMT_PROPOSED")]
    pub proposed: Option<PathBuf>,

    /// Reference schema in JSON form
    #[arg(long, global = true, env = "CONFIG_MGMT_REFERENCE")]
    pub reference: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Commit the proposed config of the open session
    Commit,
    /// Arm the revert timer ahead of a commit
    CommitConfirm(CommitConfirmArgs),
    /// Confirm the pending commit and stop the revert timer
    Confirm,
    /// Drop the unconfirmed commit and reboot
    Revert,
    /// Reboot into an archived revision
    Rollback(RollbackArgs),
    /// Load an archived revision into the open session
    RollbackSoft(RevArgs),
    /// Show differences between configurations
    Compare(CompareArgs),
    /// Compare taking loose words as options
    WrapCompare(WrapCompareArgs),
    /// Post-commit hook: archive the running config
    CommitRevision,
    /// Post-commit hook: upload the archived config
    CommitArchive,
    /// Boot hook: prepare the archive and record the first revision
    InitializeRevision,
    /// Show the commit log
    Log(LogArgs),
    /// Print an archived revision
    ShowCommitFile(RevArgs),
    /// Show the changes an archived revision introduced
    ShowCommitDiff(ShowCommitDiffArgs),
}

/// Arguments for the commit-confirm command
#[derive(clap::Args, Debug)]
pub struct CommitConfirmArgs {
    /// Minutes before an unconfirmed commit is reverted
    #[arg(short = 't', long, default_value_t = DEFAULT_CONFIRM_MINUTES)]
    pub minutes: u32,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for the rollback command
#[derive(clap::Args, Debug)]
pub struct RollbackArgs {
    /// Revision to roll back to
    #[arg(long)]
    pub rev: usize,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// A single revision number
#[derive(clap::Args, Debug)]
pub struct RevArgs {
    /// Revision number, 0 is the most recent
    #[arg(long)]
    pub rev: usize,
}

/// Arguments for the compare command
#[derive(clap::Args, Debug)]
pub struct CompareArgs {
    /// Compare against the saved boot config
    #[arg(long)]
    pub saved: bool,

    /// Print set/delete commands instead of the annotated config
    #[arg(long)]
    pub commands: bool,

    #[arg(long)]
    pub rev1: Option<usize>,

    #[arg(long)]
    pub rev2: Option<usize>,
}

/// Arguments for the wrap-compare command
#[derive(clap::Args, Debug)]
pub struct WrapCompareArgs {
    /// `commands` and up to two revision numbers, in any order
    #[arg(long, num_args = 0.., allow_hyphen_values = true)]
    pub options: Vec<String>,
}

/// Arguments for the log command
#[derive(clap::Args, Debug)]
pub struct LogArgs {
    /// Compact listing
    #[arg(long)]
    pub brief: bool,
}

/// Arguments for the show-commit-diff command
#[derive(clap::Args, Debug)]
pub struct ShowCommitDiffArgs {
    #[arg(long)]
    pub rev: usize,

    /// Older revision to compare against; defaults to the one before `rev`
    #[arg(long)]
    pub rev2: Option<usize>,

    #[arg(long)]
    pub commands: bool,
}
