//! Compare commands.

use cfgmgmt::Result;
use cfgmgmt::commit::Outcome;

use super::Context;
use crate::cli::{CompareArgs, ShowCommitDiffArgs, WrapCompareArgs};

/// Run the `compare` command
pub fn compare(ctx: &Context, args: &CompareArgs) -> Result<Outcome> {
    ctx.engine
        .compare(&ctx.session, args.saved, args.commands, args.rev1, args.rev2)
}

/// Run the `wrap-compare` command
pub fn wrap_compare(ctx: &Context, args: &WrapCompareArgs) -> Result<Outcome> {
    ctx.engine.wrap_compare(&ctx.session, &args.options)
}

/// Run the `show-commit-diff` command
pub fn show_commit_diff(ctx: &Context, args: &ShowCommitDiffArgs) -> Result<Outcome> {
    let diff = ctx
        .engine
        .show_commit_diff(&ctx.session, args.rev, args.rev2, args.commands)?;
    Ok(Outcome::ok(diff))
}
