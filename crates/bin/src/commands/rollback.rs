//! Rollback commands.

use cfgmgmt::Result;
use cfgmgmt::commit::Outcome;
use tracing::info;

use super::Context;
use crate::cli::{RevArgs, RollbackArgs};

/// Run the `rollback` command
pub fn rollback(ctx: &Context, args: &RollbackArgs) -> Result<Outcome> {
    ctx.engine.rollback(args.rev, args.yes)
}

/// Run the `rollback-soft` command, writing the result back to the
/// session's proposed config file.
pub fn rollback_soft(ctx: &mut Context, args: &RevArgs) -> Result<Outcome> {
    let outcome = ctx.engine.rollback_soft(&mut ctx.session, args.rev)?;
    if outcome.is_success()
        && let Some(proposed) = &ctx.env.proposed_config
    {
        ctx.session.source().save(ctx.session.working(), proposed)?;
        info!(path = %proposed.display(), "Proposed config updated");
    }
    Ok(outcome)
}
