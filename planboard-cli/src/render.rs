//! Table rendering of a board's lists

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use planboard::{PlanContext, Task, TaskContainer, TaskStatus};

const TITLE_WIDTH: usize = 48;

/// A table that fits the terminal, or 120 columns when not on a TTY
fn new_table() -> Table {
    let width = crossterm::terminal::size().map(|(w, _)| w).unwrap_or(120);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_width(width);
    table
}

/// Render every list of the board, then unlisted tasks if there are any
pub fn render_board(ctx: &PlanContext) -> String {
    let mut out = format!("{}\n", ctx.board().name);
    for list in ctx.lists_in_order() {
        out.push_str(&format!("\n{}\n", list.name));
        out.push_str(&render_container(ctx, &TaskContainer::List(list.id.clone())).to_string());
        out.push('\n');
    }
    if !ctx.tasks_in(&TaskContainer::Unlisted).is_empty() {
        out.push_str("\n(unlisted)\n");
        out.push_str(&render_container(ctx, &TaskContainer::Unlisted).to_string());
        out.push('\n');
    }
    out
}

/// One row per task, subtasks indented under their parent
pub fn render_container(ctx: &PlanContext, container: &TaskContainer) -> Table {
    let mut table = new_table();
    table.set_header(vec!["#", "Id", "Task", "Status", "Progress", "Blocked by"]);
    let mut rows = Vec::new();
    collect_rows(ctx, container, 0, &mut rows);
    for (index, (depth, task)) in rows.into_iter().enumerate() {
        let blocked = ctx.blocked_titles(&task.id).unwrap_or_default().join(", ");
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(task.id.as_str()),
            Cell::new(format!("{}{}", indent(depth), truncate_str(&task.title, TITLE_WIDTH))),
            Cell::new(status_label(task.status)),
            Cell::new(progress_bar(task.progress)),
            Cell::new(blocked),
        ]);
    }
    table
}

fn collect_rows<'a>(
    ctx: &'a PlanContext,
    container: &TaskContainer,
    depth: usize,
    rows: &mut Vec<(usize, &'a Task)>,
) {
    for task in ctx.tasks_in(container) {
        rows.push((depth, task));
        collect_rows(ctx, &TaskContainer::Parent(task.id.clone()), depth + 1, rows);
    }
}

fn indent(depth: usize) -> String {
    match depth {
        0 => String::new(),
        n => format!("{}- ", "  ".repeat(n - 1)),
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::InProgress => "in progress",
        TaskStatus::OnHold => "on hold",
        TaskStatus::Completed => "done",
        TaskStatus::Cancelled => "cancelled",
    }
}

/// Ten-cell bar followed by the percentage
pub fn progress_bar(progress: u8) -> String {
    let filled = (progress.min(100) as usize) / 10;
    format!("{}{} {:>3}%", "#".repeat(filled), ".".repeat(10 - filled), progress)
}

/// Truncate to `max` characters, appending "..." if truncated
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
