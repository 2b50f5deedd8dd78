//! Commit log commands.

use cfgmgmt::Result;
use cfgmgmt::commit::{Outcome, format_log_data, format_log_data_brief};

use super::Context;
use crate::cli::{LogArgs, RevArgs};
use crate::output::OutputFormat;

/// Run the `log` command
pub fn log(ctx: &Context, args: &LogArgs, format: OutputFormat) -> Result<Outcome> {
    let entries = ctx.engine.raw_log_data()?;
    let text = match format {
        OutputFormat::Json => serde_json::to_string(&entries)?,
        OutputFormat::Human if args.brief => format_log_data_brief(&entries),
        OutputFormat::Human => format_log_data(&entries),
    };
    Ok(Outcome::ok(text))
}

/// Run the `show-commit-file` command
pub fn show_commit_file(ctx: &Context, args: &RevArgs) -> Result<Outcome> {
    Ok(Outcome::ok(ctx.engine.show_commit_file(args.rev)?))
}
