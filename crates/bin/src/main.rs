use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::Context;
use output::{OutputFormat, print_outcome};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean
    let filter = EnvFilter::from_default_env();
    let filter = match "cfgmgmt=warn".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!(module = err.module(), "{err}");
            eprintln!("{err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> cfgmgmt::Result<u8> {
    let format = OutputFormat::from_flag(cli.json);
    let mut ctx = Context::open(&cli.paths)?;

    let outcome = match &cli.command {
        Commands::Commit => commands::confirm::commit(&mut ctx)?,
        Commands::CommitConfirm(args) => commands::confirm::commit_confirm(&ctx, args)?,
        Commands::Confirm => commands::confirm::confirm(&ctx)?,
        Commands::Revert => commands::confirm::revert(&ctx)?,
        Commands::Rollback(args) => commands::rollback::rollback(&ctx, args)?,
        Commands::RollbackSoft(args) => commands::rollback::rollback_soft(&mut ctx, args)?,
        Commands::Compare(args) => commands::compare::compare(&ctx, args)?,
        Commands::WrapCompare(args) => commands::compare::wrap_compare(&ctx, args)?,
        Commands::CommitRevision => commands::hooks::commit_revision(&ctx)?,
        Commands::CommitArchive => commands::hooks::commit_archive(&ctx)?,
        Commands::InitializeRevision => commands::hooks::initialize_revision(&ctx)?,
        Commands::Log(args) => commands::log::log(&ctx, args, format)?,
        Commands::ShowCommitFile(args) => commands::log::show_commit_file(&ctx, args)?,
        Commands::ShowCommitDiff(args) => commands::compare::show_commit_diff(&ctx, args)?,
    };

    print_outcome(&outcome);
    Ok(u8::try_from(outcome.code).unwrap_or(1))
}
