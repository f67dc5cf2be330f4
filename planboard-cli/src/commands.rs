//! Subcommand implementations.
//!
//! Each `run_*` function writes its report to `out` so tests can capture it.

use crate::render::render_board;
use crate::snapshot_file::{read_snapshot, write_snapshot};
use anyhow::{bail, Context, Result};
use planboard::{
    apply_all, parse_commands, Board, BoardController, BoardSnapshot, List, ListId, MutationSet,
    Ordinal, PlanContext, PlannerSettings, TaskContainer, TaskId,
};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

fn load_context(file: &Path, settings: &PlannerSettings) -> Result<PlanContext> {
    let snapshot = read_snapshot(file)?;
    PlanContext::from_snapshot(snapshot, settings.clone())
        .with_context(|| format!("inconsistent snapshot {}", file.display()))
}

/// `planboard init`
pub fn run_init(
    file: &Path,
    name: &str,
    lists: &[String],
    force: bool,
    out: &mut impl Write,
) -> Result<()> {
    if file.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", file.display());
    }
    let board = Board::new(name);
    let mut snapshot = BoardSnapshot::new(board.clone());
    for (list_name, position) in lists.iter().zip(Ordinal::spread(lists.len())) {
        snapshot
            .lists
            .push(List::new(ListId::new(), board.id.clone(), list_name, position));
    }
    write_snapshot(file, &snapshot)?;
    info!(board = %board.id, lists = lists.len(), "initialized board");
    writeln!(out, "Created board '{}' in {}", name, file.display())?;
    Ok(())
}

/// `planboard show`
pub fn run_show(
    file: &Path,
    json: bool,
    settings: &PlannerSettings,
    out: &mut impl Write,
) -> Result<()> {
    let ctx = load_context(file, settings)?;
    if json {
        writeln!(out, "{}", ctx.snapshot().to_json()?)?;
    } else {
        write!(out, "{}", render_board(&ctx))?;
    }
    Ok(())
}

/// `planboard apply`: prints the combined mutation batch as JSON
pub fn run_apply(
    file: &Path,
    commands: &Path,
    dry_run: bool,
    settings: &PlannerSettings,
    out: &mut impl Write,
) -> Result<()> {
    let text = fs::read_to_string(commands)
        .with_context(|| format!("failed to read commands {}", commands.display()))?;
    let commands = parse_commands(&text).context("invalid commands file")?;

    let mut controller = BoardController::new(load_context(file, settings)?);
    let count = commands.len();
    let mutations = apply_all(&mut controller, commands)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&mutations)?)?;

    if dry_run {
        info!(commands = count, "dry run; snapshot not written");
    } else if !mutations.is_empty() {
        write_snapshot(file, &controller.context().snapshot())?;
        info!(commands = count, mutations = mutations.len(), "applied commands");
    }
    Ok(())
}

/// `planboard blocked`
pub fn run_blocked(
    file: &Path,
    task: &str,
    settings: &PlannerSettings,
    out: &mut impl Write,
) -> Result<()> {
    let ctx = load_context(file, settings)?;
    let task = TaskId::from_string(task);
    let titles = ctx.blocked_titles(&task)?;
    if titles.is_empty() {
        writeln!(out, "'{}' is not blocked", ctx.task(&task)?.title)?;
    } else {
        writeln!(out, "Blocked by: {}", titles.join(", "))?;
    }
    Ok(())
}

/// `planboard rebalance`
pub fn run_rebalance(
    file: &Path,
    all: bool,
    settings: &PlannerSettings,
    out: &mut impl Write,
) -> Result<()> {
    let mut ctx = load_context(file, settings)?;
    let lists: Vec<ListId> = ctx.lists_in_order().iter().map(|l| l.id.clone()).collect();

    let mut mutations = MutationSet::new();
    let mut rebalanced = 0;
    for list in lists {
        if all || ctx.list_needs_rebalance(&list) {
            mutations.extend(ctx.rebalance(&TaskContainer::List(list))?);
            rebalanced += 1;
        }
    }
    if all || ctx.lists_need_rebalance() {
        mutations.extend(ctx.rebalance_lists()?);
        writeln!(out, "Rebalanced list order")?;
    }

    if !mutations.is_empty() {
        write_snapshot(file, &ctx.snapshot())?;
        info!(lists = rebalanced, mutations = mutations.len(), "rebalanced ranks");
    }
    writeln!(out, "Rebalanced {} list(s)", rebalanced)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("board.json");
        let mut out = Vec::new();
        run_init(&file, "Q3 Launch", &["Backlog".into()], false, &mut out).unwrap();
        assert!(run_init(&file, "Other", &[], false, &mut out).is_err());
        run_init(&file, "Other", &[], true, &mut out).unwrap();
        assert_eq!(read_snapshot(&file).unwrap().board.name, "Other");
    }

    #[test]
    fn test_init_orders_lists() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("board.yaml");
        let lists = vec!["Backlog".to_string(), "Doing".to_string(), "Done".to_string()];
        run_init(&file, "Q3 Launch", &lists, false, &mut Vec::new()).unwrap();

        let ctx = load_context(&file, &PlannerSettings::default()).unwrap();
        let names: Vec<&str> = ctx.lists_in_order().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Backlog", "Doing", "Done"]);
    }
}
