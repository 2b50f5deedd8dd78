//! Output formatting helpers for human-readable and JSON output.

use cfgmgmt::commit::Outcome;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }
}

/// Print the message of a finished command: stdout on success, stderr for
/// refused requests. Empty messages print nothing.
pub fn print_outcome(outcome: &Outcome) {
    if outcome.message.is_empty() {
        return;
    }
    if outcome.is_success() {
        println!("{}", outcome.message);
    } else {
        eprintln!("{}", outcome.message);
    }
}
