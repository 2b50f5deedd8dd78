//! Commit and commit-confirm commands.

use cfgmgmt::Result;
use cfgmgmt::commit::{CommitMeta, Outcome};

use super::Context;
use crate::cli::CommitConfirmArgs;

/// Run the `commit` command
pub fn commit(ctx: &mut Context) -> Result<Outcome> {
    let meta = CommitMeta::from_env();
    let report = ctx.engine.commit(&mut ctx.session, &meta)?;
    Ok(Outcome::ok(report))
}

/// Run the `commit-confirm` command
pub fn commit_confirm(ctx: &Context, args: &CommitConfirmArgs) -> Result<Outcome> {
    ctx.engine
        .commit_confirm(ctx.session.running(), args.minutes, args.yes)
}

/// Run the `confirm` command
pub fn confirm(ctx: &Context) -> Result<Outcome> {
    ctx.engine
        .confirm(ctx.session.running(), &CommitMeta::from_env())
}

/// Run the `revert` command
pub fn revert(ctx: &Context) -> Result<Outcome> {
    ctx.engine.revert()
}
