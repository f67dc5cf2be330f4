//! Planboard CLI - apply board operations to snapshot files.
//!
//! Commands:
//! - `planboard init <file> --name <name> [--list <name>...]`: Create a snapshot
//! - `planboard show <file>`: Show lists and tasks in order
//! - `planboard apply <file> <commands> [--dry-run]`: Apply commands, print mutations
//! - `planboard blocked <file> <task>`: Show what blocks a task
//! - `planboard rebalance <file> [--all]`: Respread ranks
//!
//! Environment variables:
//! - PLANBOARD_MAX_RANK_LEN: Rank length at which a list is due for rebalancing
//! - PLANBOARD_AUTO_COMPLETE_PARENTS: Complete parents with their subtasks
//! - RUST_LOG: Log filter when --debug is not given
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error

use clap::Parser;
use tracing_subscriber::EnvFilter;

use planboard_cli::{commands, Cli, Commands, ConfigLoader};

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = ConfigLoader::new().with_file(cli.config).load()?;
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Init {
            file,
            name,
            lists,
            force,
        } => commands::run_init(&file, &name, &lists, force, &mut stdout),
        Commands::Show { file, json } => commands::run_show(&file, json, &settings, &mut stdout),
        Commands::Apply {
            file,
            commands: commands_file,
            dry_run,
        } => commands::run_apply(&file, &commands_file, dry_run, &settings, &mut stdout),
        Commands::Blocked { file, task } => {
            commands::run_blocked(&file, &task, &settings, &mut stdout)
        }
        Commands::Rebalance { file, all } => {
            commands::run_rebalance(&file, all, &settings, &mut stdout)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("planboard=debug,planboard_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
