//! CLI definition for the planboard command-line interface.
//!
//! This module only depends on `clap` and `std`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Planboard - ordering, dependency gating and progress rollup for board
/// snapshot files.
#[derive(Parser, Debug)]
#[command(name = "planboard")]
#[command(version)]
#[command(about = "Apply board operations to planboard snapshot files")]
#[command(
    long_about = "Planboard loads a board snapshot (JSON or YAML, chosen by file extension), \
    applies operations through the planning engine and prints the resulting mutation batch.\n\n\
    Configuration is read from ~/.planboard/config.{toml,yaml,json}, then \
    ./.planboard/config.{toml,yaml,json}, then --config, then PLANBOARD_* environment variables.\n\n\
    Environment variables:\n  \
    PLANBOARD_MAX_RANK_LEN          Rank length at which a list is due for rebalancing\n  \
    PLANBOARD_AUTO_COMPLETE_PARENTS Complete parents once all subtasks are completed"
)]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Extra configuration file, applied after the discovered ones
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new board snapshot file
    Init {
        /// Snapshot file to create (.json, .yaml or .yml)
        file: PathBuf,
        /// Board name
        #[arg(long)]
        name: String,
        /// Lists to create, in order
        #[arg(long = "list", value_name = "NAME")]
        lists: Vec<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show lists and their tasks in order
    Show {
        /// Snapshot file
        file: PathBuf,
        /// Output the snapshot as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Apply a file of board commands and print the mutation batch
    Apply {
        /// Snapshot file
        file: PathBuf,
        /// Commands file: one command or an array, JSON or YAML
        commands: PathBuf,
        /// Print the mutations without writing the snapshot back
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the titles of the open tasks blocking a task
    Blocked {
        /// Snapshot file
        file: PathBuf,
        /// Task id
        task: String,
    },

    /// Respread ranks of lists that need it
    Rebalance {
        /// Snapshot file
        file: PathBuf,
        /// Rebalance every list, not just those past the rank length ceiling
        #[arg(long)]
        all: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_init_with_lists() {
        let cli = Cli::try_parse_from([
            "planboard", "init", "board.yaml", "--name", "Q3 Launch", "--list", "Backlog",
            "--list", "Doing",
        ])
        .unwrap();
        match cli.command {
            Commands::Init { name, lists, .. } => {
                assert_eq!(name, "Q3 Launch");
                assert_eq!(lists, vec!["Backlog", "Doing"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["planboard", "show", "board.json", "--debug", "--config", "c.toml"])
                .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }
}
