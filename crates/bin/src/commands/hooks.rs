//! Commit and boot hooks.

use cfgmgmt::Result;
use cfgmgmt::commit::{CommitMeta, Outcome};

use super::Context;

/// Run the `commit-revision` hook
pub fn commit_revision(ctx: &Context) -> Result<Outcome> {
    ctx.engine
        .commit_revision(ctx.session.running(), &CommitMeta::from_env())?;
    Ok(Outcome::ok(""))
}

/// Run the `commit-archive` hook
pub fn commit_archive(ctx: &Context) -> Result<Outcome> {
    Ok(Outcome::ok(ctx.engine.commit_archive()))
}

/// Run the `initialize-revision` hook
pub fn initialize_revision(ctx: &Context) -> Result<Outcome> {
    ctx.engine
        .initialize_revision(ctx.session.running(), &CommitMeta::from_env())?;
    Ok(Outcome::ok(""))
}
