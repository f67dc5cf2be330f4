//! End-to-end tests for the planboard subcommands

use assert_cmd::Command;
use planboard::{Ordinal, PlanContext, PlannerSettings, TaskContainer, TaskId, TaskStatus};
use planboard_cli::commands::{run_apply, run_blocked, run_init, run_rebalance, run_show};
use planboard_cli::snapshot_file::{read_snapshot, write_snapshot};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LAUNCH_COMMANDS: &str = r#"[
  { "op": "create_list", "id": "doing", "name": "Doing" },
  { "op": "create_task", "id": "venue", "title": "Book venue", "list": "doing" },
  { "op": "create_task", "id": "invites", "title": "Send invites", "list": "doing" },
  { "op": "add_dependency", "blocking": "venue", "dependent": "invites" }
]"#;

fn settings() -> PlannerSettings {
    PlannerSettings::default()
}

fn write_commands(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// An initialized board with the launch commands applied
fn launch_board(temp: &TempDir, file_name: &str) -> PathBuf {
    let board = temp.path().join(file_name);
    run_init(&board, "Q3 Launch", &[], false, &mut Vec::new()).unwrap();
    let commands = write_commands(temp.path(), "launch.json", LAUNCH_COMMANDS);
    run_apply(&board, &commands, false, &settings(), &mut Vec::new()).unwrap();
    board
}

fn load(board: &Path) -> PlanContext {
    PlanContext::from_snapshot(read_snapshot(board).unwrap(), settings()).unwrap()
}

#[test]
fn test_apply_persists_and_prints_mutations() {
    let temp = TempDir::new().unwrap();
    let board = temp.path().join("board.json");
    run_init(&board, "Q3 Launch", &[], false, &mut Vec::new()).unwrap();
    let commands = write_commands(temp.path(), "launch.json", LAUNCH_COMMANDS);

    let mut out = Vec::new();
    run_apply(&board, &commands, false, &settings(), &mut out).unwrap();
    let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(printed.as_array().unwrap().len(), 4);

    let ctx = load(&board);
    assert_eq!(ctx.task_count(), 2);
    assert!(ctx.is_blocked(&TaskId::from_string("invites")).unwrap());
}

#[test]
fn test_dry_run_leaves_snapshot_untouched() {
    let temp = TempDir::new().unwrap();
    let board = launch_board(&temp, "board.yaml");
    let before = fs::read_to_string(&board).unwrap();

    let commands = write_commands(
        temp.path(),
        "finish.yaml",
        "- op: complete_task\n  task: venue\n",
    );
    let mut out = Vec::new();
    run_apply(&board, &commands, true, &settings(), &mut out).unwrap();

    assert!(String::from_utf8(out).unwrap().contains("set_status"));
    assert_eq!(fs::read_to_string(&board).unwrap(), before);
}

#[test]
fn test_failed_command_does_not_write() {
    let temp = TempDir::new().unwrap();
    let board = launch_board(&temp, "board.json");
    let before = fs::read_to_string(&board).unwrap();

    let commands = write_commands(
        temp.path(),
        "early.json",
        r#"{ "op": "complete_task", "task": "invites" }"#,
    );
    let err = run_apply(&board, &commands, false, &settings(), &mut Vec::new()).unwrap_err();
    assert!(err.to_string().contains("blocked by"));
    assert_eq!(fs::read_to_string(&board).unwrap(), before);
}

#[test]
fn test_blocked_reports_titles() {
    let temp = TempDir::new().unwrap();
    let board = launch_board(&temp, "board.json");

    let mut out = Vec::new();
    run_blocked(&board, "invites", &settings(), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Blocked by: Book venue\n");

    let mut out = Vec::new();
    run_blocked(&board, "venue", &settings(), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "'Book venue' is not blocked\n");

    assert!(run_blocked(&board, "missing", &settings(), &mut Vec::new()).is_err());
}

#[test]
fn test_show_renders_tables_and_json() {
    let temp = TempDir::new().unwrap();
    let board = launch_board(&temp, "board.json");

    let mut out = Vec::new();
    run_show(&board, false, &settings(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Q3 Launch\n"));
    assert!(text.find("Book venue").unwrap() < text.find("Send invites").unwrap());

    let mut out = Vec::new();
    run_show(&board, true, &settings(), &mut out).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["board"]["name"], "Q3 Launch");
    assert_eq!(json["dependencies"].as_array().unwrap().len(), 1);
}

#[test]
fn test_rebalance_all_keeps_order() {
    let temp = TempDir::new().unwrap();
    let board = launch_board(&temp, "board.json");

    let mut out = Vec::new();
    run_rebalance(&board, true, &settings(), &mut out).unwrap();
    assert!(String::from_utf8(out).unwrap().contains("Rebalanced 1 list(s)"));

    let ctx = load(&board);
    let doing = TaskContainer::List(planboard::ListId::from_string("doing"));
    let titles: Vec<&str> = ctx.tasks_in(&doing).iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Book venue", "Send invites"]);
}

#[test]
fn test_rebalance_writes_respread_task_ranks() {
    let temp = TempDir::new().unwrap();
    let board = launch_board(&temp, "board.json");
    let mut snapshot = read_snapshot(&board).unwrap();
    for task in &mut snapshot.tasks {
        task.position = Ordinal::parse("k").unwrap();
    }
    write_snapshot(&board, &snapshot).unwrap();

    let mut out = Vec::new();
    run_rebalance(&board, false, &settings(), &mut out).unwrap();
    assert!(String::from_utf8(out).unwrap().contains("Rebalanced 1 list(s)"));

    let ctx = load(&board);
    let doing = TaskContainer::List(planboard::ListId::from_string("doing"));
    let tasks = ctx.tasks_in(&doing);
    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Book venue", "Send invites"]);
    assert!(tasks[0].position < tasks[1].position);
    assert!(!ctx.list_needs_rebalance(&planboard::ListId::from_string("doing")));
}

#[test]
fn test_rebalance_writes_respread_list_order() {
    let temp = TempDir::new().unwrap();
    let board = temp.path().join("board.yaml");
    let lists = vec!["Backlog".to_string(), "Done".to_string()];
    run_init(&board, "Q3 Launch", &lists, false, &mut Vec::new()).unwrap();
    let mut snapshot = read_snapshot(&board).unwrap();
    for list in &mut snapshot.lists {
        list.position = Ordinal::parse("k").unwrap();
    }
    write_snapshot(&board, &snapshot).unwrap();

    let mut out = Vec::new();
    run_rebalance(&board, false, &settings(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Rebalanced list order"));
    assert!(text.contains("Rebalanced 0 list(s)"));

    let reloaded = read_snapshot(&board).unwrap();
    let names: Vec<&str> = reloaded.lists.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Backlog", "Done"]);
    assert!(reloaded.lists[0].position < reloaded.lists[1].position);
    assert!(!load(&board).lists_need_rebalance());
}

#[test]
fn test_rebalance_leaves_ordered_board_untouched() {
    let temp = TempDir::new().unwrap();
    let board = launch_board(&temp, "board.json");
    let before = fs::read_to_string(&board).unwrap();

    let mut out = Vec::new();
    run_rebalance(&board, false, &settings(), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Rebalanced 0 list(s)\n");
    assert_eq!(fs::read_to_string(&board).unwrap(), before);
}

#[test]
fn test_completion_chain_through_files() {
    let temp = TempDir::new().unwrap();
    let board = launch_board(&temp, "board.json");
    let commands = write_commands(
        temp.path(),
        "finish.json",
        r#"[
          { "op": "complete_task", "task": "venue" },
          { "op": "complete_task", "task": "invites" }
        ]"#,
    );
    run_apply(&board, &commands, false, &settings(), &mut Vec::new()).unwrap();

    let ctx = load(&board);
    let invites = ctx.task(&TaskId::from_string("invites")).unwrap();
    assert_eq!(invites.status, TaskStatus::Completed);
    assert_eq!(invites.progress, 100);
}

fn planboard(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("planboard").unwrap();
    cmd.current_dir(temp.path())
        .env("HOME", temp.path())
        .env_remove("PLANBOARD_MAX_RANK_LEN")
        .env_remove("PLANBOARD_AUTO_COMPLETE_PARENTS");
    cmd
}

#[test]
fn test_binary_exits_with_error_on_blocked_completion() {
    let temp = TempDir::new().unwrap();
    let board = launch_board(&temp, "board.json");
    let commands = write_commands(
        temp.path(),
        "early.json",
        r#"{ "op": "complete_task", "task": "invites" }"#,
    );

    planboard(&temp)
        .arg("apply")
        .arg(&board)
        .arg(&commands)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:").and(predicate::str::contains("blocked by")));
}

#[test]
fn test_binary_init_and_show() {
    let temp = TempDir::new().unwrap();

    planboard(&temp)
        .args(["init", "board.yaml", "--name", "Q3 Launch", "--list", "Backlog", "--list", "Done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created board 'Q3 Launch'"));

    planboard(&temp)
        .args(["show", "board.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backlog").and(predicate::str::contains("Done")));
}
