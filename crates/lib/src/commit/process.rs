//! Capabilities backed by system commands.

use std::ffi::OsStr;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

use tracing::{debug, info};

use super::CommitError;
use super::capability::{
    AcceptAll, Capabilities, ConfirmTimer, FileOwnership, Notifier, Prompt, Rebooter, Uploader,
};
use crate::constants::{CONFIG_GROUP, CONFIRM_NOTIFIER, CONFIRM_TIMER_UNIT};

/// Runs a command to completion and fails on a non-zero exit.
fn run<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<Output, CommitError> {
    let line = command_line(program, args);
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| CommitError::subprocess(&line, err.to_string()))?;
    debug!(command = %line, status = %output.status, "Command finished");
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => output.status.to_string(),
            text => text.to_string(),
        };
        return Err(CommitError::subprocess(line, reason));
    }
    Ok(output)
}

fn command_line<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.as_ref().to_string_lossy());
    }
    line
}

/// A transient systemd timer running the revert action.
#[derive(Debug, Clone)]
pub struct SystemdTimer {
    unit: String,
    revert_command: String,
}

impl SystemdTimer {
    /// `revert_command` is run through `sg` as the configuration group.
    pub fn new(unit: impl Into<String>, revert_command: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            revert_command: revert_command.into(),
        }
    }

    fn timer(&self) -> String {
        format!("{}.timer", self.unit)
    }
}

impl ConfirmTimer for SystemdTimer {
    fn is_armed(&self) -> bool {
        Command::new("systemctl")
            .args(["is-active", "--quiet", self.timer().as_str()])
            .stdin(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    fn arm(&self, minutes: u32) -> Result<(), CommitError> {
        let on_active = format!("--on-active={minutes}m");
        let unit = format!("--unit={}", self.unit);
        run(
            "sudo",
            &[
                "systemd-run",
                "--quiet",
                on_active.as_str(),
                unit.as_str(),
                "sg",
                CONFIG_GROUP,
                self.revert_command.as_str(),
            ],
        )?;
        info!(unit = %self.unit, minutes, "Commit-confirm timer armed");
        Ok(())
    }

    fn disarm(&self) -> Result<(), CommitError> {
        run("sudo", &["systemctl", "stop", "--quiet", self.timer().as_str()])?;
        info!(unit = %self.unit, "Commit-confirm timer stopped");
        Ok(())
    }
}

/// Starts the notifier program in the background and kills it by name.
#[derive(Debug, Clone)]
pub struct NotifyCommand {
    program: PathBuf,
}

impl Default for NotifyCommand {
    fn default() -> Self {
        Self::new(CONFIRM_NOTIFIER)
    }
}

impl NotifyCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Notifier for NotifyCommand {
    fn start(&self, minutes: u32) -> Result<(), CommitError> {
        let program = self.program.to_string_lossy();
        let minutes = minutes.to_string();
        run("sudo", &["-b", &*program, minutes.as_str()])?;
        Ok(())
    }

    fn stop(&self) -> Result<(), CommitError> {
        let name = self
            .program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match run("sudo", &["pkill", "-f", name.as_str()]) {
            Ok(_) => Ok(()),
            // pkill exits 1 when no process matched
            Err(CommitError::Subprocess { reason, .. }) if reason == "exit status: 1" => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// `systemctl reboot`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemReboot;

impl Rebooter for SystemReboot {
    fn reboot(&self) -> Result<(), CommitError> {
        info!("Requesting system reboot");
        run("sudo", &["systemctl", "reboot"])?;
        Ok(())
    }
}

/// Uploads with `curl`, which covers the ftp, sftp, scp, http(s) and tftp
/// schemes archive locations use.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlUploader;

impl Uploader for CurlUploader {
    fn upload(&self, file: &Path, destination: &str, source_address: Option<&str>) -> Result<(), CommitError> {
        let file = file.to_string_lossy();
        let mut args = vec!["--silent", "--show-error", "--fail", "--upload-file", &*file];
        if let Some(address) = source_address {
            args.extend(["--interface", address]);
        }
        args.push(destination);
        run("curl", args.as_slice())?;
        Ok(())
    }
}

/// Asks on the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask_yes_no(&self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let stdin = io::stdin();
        loop {
            print!("{question} {hint} ");
            if io::stdout().flush().is_err() {
                return default;
            }
            let mut answer = String::new();
            match stdin.lock().read_line(&mut answer) {
                Ok(0) | Err(_) => return default,
                Ok(_) => {}
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return default,
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => println!("Please answer yes or no."),
            }
        }
    }
}

/// `chgrp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chgrp;

impl FileOwnership for Chgrp {
    fn set_group(&self, path: &Path, group: &str) -> Result<(), CommitError> {
        run("chgrp", &[OsStr::new(group), path.as_os_str()])?;
        Ok(())
    }
}

impl Capabilities {
    /// The process-backed services of a running system.
    ///
    /// `revert_command` is what the commit-confirm timer runs on expiry.
    pub fn system(revert_command: impl Into<String>) -> Self {
        Self {
            timer: Arc::new(SystemdTimer::new(CONFIRM_TIMER_UNIT, revert_command)),
            notifier: Arc::new(NotifyCommand::default()),
            rebooter: Arc::new(SystemReboot),
            uploader: Arc::new(CurlUploader),
            prompt: Arc::new(TerminalPrompt),
            ownership: Arc::new(Chgrp),
            validator: Arc::new(AcceptAll),
        }
    }
}
