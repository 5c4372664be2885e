mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
    pub state_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: cli.config,
        state_path: cli.state,
    };

    match run(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Plan(args) => commands::plan::run(ctx, args.target.as_deref(), args.prune),
        Command::Apply(args) => commands::apply::run(
            ctx,
            commands::apply::ApplyRequest {
                target: args.target.as_deref(),
                dry_run: args.dry_run,
                jobs: args.jobs,
                yes: args.yes,
                prune: args.prune,
            },
        ),
        Command::Show { name, json } => commands::inspect::show(ctx, &name, json),
        Command::Exists { name } => commands::inspect::exists(ctx, &name),
        Command::Drop { name, force, yes } => commands::drop::run(ctx, &name, force, yes),
        Command::Probe { json } => commands::inspect::probe(ctx, json),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "pgconverge", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print an error chain, with advice when a catalog error is in it
fn report(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));
    if let Some(catalog) = err.chain().find_map(|e| e.downcast_ref::<pgcatalog::Error>()) {
        ui::dim(catalog.kind().advice());
    }
}
