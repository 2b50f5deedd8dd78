//! Constants used throughout the cfgmgmt library.
//!
//! This module provides central definitions for well-known file locations,
//! environment variable names and default values of the commit machinery.

/// Directory holding the saved boot configuration.
pub const CONFIG_DIR: &str = "/config";

/// File name of the saved boot configuration, also used inside the archive.
pub const CONFIG_FILE_NAME: &str = "config.boot";

/// Directory name of the revision archive below [`CONFIG_DIR`].
pub const ARCHIVE_DIR_NAME: &str = "archive";

/// Commit log file name inside the archive.
pub const COMMIT_LOG_NAME: &str = "commits";

/// Rotation policy file name inside the archive.
pub const ROTATION_CONF_NAME: &str = "lr.conf";

/// Rotation state file name inside the archive.
pub const ROTATION_STATE_NAME: &str = "lr.state";

/// Staged rollback target inside the archive.
pub const ROLLBACK_NAME: &str = "config.boot-rollback";

/// Pre-rollback snapshot inside the archive.
pub const PREROLLBACK_NAME: &str = "config.boot-prerollback";

/// Runtime directory holding the running configuration and its JSON mirror.
pub const RUNTIME_DIR: &str = "/run/vyatta/config";

/// Running configuration text file name inside [`RUNTIME_DIR`].
pub const RUNNING_CONFIG_NAME: &str = "running.boot";

/// Proposed configuration text file name inside [`RUNTIME_DIR`].
pub const PROPOSED_CONFIG_NAME: &str = "proposed.boot";

/// JSON projection of the running configuration inside [`RUNTIME_DIR`].
pub const CONFIG_JSON_NAME: &str = "config.json";

/// Scratch directory for temporary files.
pub const TMP_DIR: &str = "/tmp";

/// Pending commit-confirm log line, below [`TMP_DIR`].
pub const TMP_LOG_ENTRY_NAME: &str = "commit-rev-entry";

/// Scratch copy of the running config used by `unsaved_commits`.
pub const TMP_RUNNING_NAME: &str = "config.running";

/// Group owning the archive, the commit log and the JSON projection.
pub const CONFIG_GROUP: &str = "vyattacfg";

/// Location of the live ACME certificates referenced by `pki certificate <name> acme`.
pub const CERTBOT_DIR: &str = "/config/auth/letsencrypt";

/// Systemd unit name of the commit-confirm timer.
pub const CONFIRM_TIMER_UNIT: &str = "commit-confirm";

/// Notifier started alongside the commit-confirm timer.
pub const CONFIRM_NOTIFIER: &str = "/usr/libexec/vyos/commit-confirm-notify.py";

/// Default commit-confirm window in minutes.
pub const DEFAULT_CONFIRM_MINUTES: u32 = 10;

/// Number of archived revisions kept when the configuration does not say.
pub const DEFAULT_COMMIT_REVISIONS: usize = 100;

/// Host name used for remote archive file names when none is configured.
pub const DEFAULT_HOSTNAME: &str = "vyos";

/// Edit level of the calling shell, slash separated.
pub const ENV_EDIT_LEVEL: &str = "EDIT_LEVEL";

/// Legacy name of [`ENV_EDIT_LEVEL`].
pub const ENV_LEGACY_EDIT_LEVEL: &str = "VYATTA_EDIT_LEVEL";

/// Source channel of the current commit.
pub const ENV_COMMIT_VIA: &str = "COMMIT_VIA";

/// Free-form comment of the current commit.
pub const ENV_COMMIT_COMMENT: &str = "COMMIT_COMMENT";

/// Set while committing under commit-confirm.
pub const ENV_IN_COMMIT_CONFIRM: &str = "IN_COMMIT_CONFIRM";

/// Default for [`ENV_COMMIT_VIA`].
pub const DEFAULT_COMMIT_VIA: &str = "other";

/// Default for [`ENV_COMMIT_COMMENT`].
pub const DEFAULT_COMMIT_COMMENT: &str = "commit";

/// Configuration path of the revision limit.
pub const COMMIT_REVISIONS_PATH: [&str; 3] = ["system", "config-management", "commit-revisions"];

/// Configuration path of the remote archive locations.
pub const COMMIT_ARCHIVE_LOCATION_PATH: [&str; 4] =
    ["system", "config-management", "commit-archive", "location"];

/// Configuration path of the remote archive source address.
pub const COMMIT_ARCHIVE_SOURCE_PATH: [&str; 4] = [
    "system",
    "config-management",
    "commit-archive",
    "source-address",
];
