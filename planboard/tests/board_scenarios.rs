//! End-to-end board scenarios through the controller

use planboard::{
    Board, BoardController, DeleteListStrategy, DropTarget, ListId, Mutation, NewTask,
    PlanContext, PlanError, PlannerSettings, TaskContainer, TaskId, TaskStatus,
};

fn board() -> BoardController {
    BoardController::new(PlanContext::new(
        Board::new("Q3 Launch"),
        PlannerSettings::default(),
    ))
}

fn task_in(board: &mut BoardController, list: &ListId, title: &str) -> TaskId {
    board
        .create_task(NewTask::new(title), Some(list), None, usize::MAX)
        .unwrap()
        .0
}

fn subtask(board: &mut BoardController, parent: &TaskId, title: &str) -> TaskId {
    board
        .create_task(NewTask::new(title), None, Some(parent), usize::MAX)
        .unwrap()
        .0
}

fn titles(board: &BoardController, list: &ListId) -> Vec<String> {
    board
        .context()
        .tasks_in(&TaskContainer::List(list.clone()))
        .into_iter()
        .map(|t| t.title.clone())
        .collect()
}

fn state(board: &BoardController, id: &TaskId) -> (TaskStatus, u8) {
    let task = board.context().task(id).unwrap();
    (task.status, task.progress)
}

#[test]
fn test_q3_launch_moves_into_empty_list() {
    let mut board = board();
    let (backlog, _) = board.create_list("Backlog", 0).unwrap();
    let (doing, _) = board.create_list("Doing", 1).unwrap();
    let t1 = task_in(&mut board, &doing, "T1");
    let t2 = task_in(&mut board, &doing, "T2");

    let set = board
        .on_drag_end(&t1, DropTarget::list(backlog.clone(), 0))
        .unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(titles(&board, &backlog), vec!["T1"]);
    assert_eq!(titles(&board, &doing), vec!["T2"]);

    board
        .on_drag_end(&t2, DropTarget::list(backlog.clone(), 0))
        .unwrap();
    assert_eq!(titles(&board, &backlog), vec!["T2", "T1"]);
    assert!(titles(&board, &doing).is_empty());
    assert!(board.context().task_order().is_consistent());
}

#[test]
fn test_drag_onto_task_in_other_list() {
    let mut board = board();
    let (backlog, _) = board.create_list("Backlog", 0).unwrap();
    let (doing, _) = board.create_list("Doing", 1).unwrap();
    let a = task_in(&mut board, &backlog, "A");
    let b = task_in(&mut board, &doing, "B");
    task_in(&mut board, &doing, "C");

    let set = board.on_drag_end(&a, DropTarget::task(b)).unwrap();
    match set.iter().next() {
        Some(Mutation::PlaceTask { list, parent, .. }) => {
            assert_eq!(list.as_ref(), Some(&doing));
            assert!(parent.is_none());
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(titles(&board, &doing), vec!["A", "B", "C"]);
}

#[test]
fn test_aborted_drag_changes_nothing() {
    let mut board = board();
    let (backlog, _) = board.create_list("Backlog", 0).unwrap();
    let (doing, _) = board.create_list("Doing", 1).unwrap();
    let t1 = task_in(&mut board, &doing, "T1");
    let before = board.context().snapshot();

    board.pick_up(&t1).unwrap();
    board.drag_over(DropTarget::list(backlog, 0)).unwrap();
    board.abort();
    assert_eq!(board.drop().unwrap(), None);
    assert_eq!(board.context().snapshot(), before);
}

#[test]
fn test_completion_gated_along_chain() {
    let mut board = board();
    let (doing, _) = board.create_list("Doing", 0).unwrap();
    let a = task_in(&mut board, &doing, "Book venue");
    let b = task_in(&mut board, &doing, "Print badges");
    let c = task_in(&mut board, &doing, "Open doors");
    board.add_dependency(&a, &b).unwrap();
    board.add_dependency(&b, &c).unwrap();

    let err = board.complete_task(&c).unwrap_err();
    assert!(err.is_user_facing());
    assert!(matches!(err, PlanError::BlockedByDependencies { ref blockers, .. } if blockers == &vec![b.clone()]));
    assert_eq!(board.blocked_titles(&c).unwrap(), vec!["Print badges"]);

    let err = board.complete_task(&b).unwrap_err();
    assert!(matches!(err, PlanError::BlockedByDependencies { .. }));

    board.complete_task(&a).unwrap();
    board.complete_task(&b).unwrap();
    let outcome = board.complete_task(&c).unwrap();
    assert!(!outcome.mutations.is_empty());
    assert_eq!(state(&board, &c), (TaskStatus::Completed, 100));

    let cycle = board.add_dependency(&c, &a).unwrap_err();
    assert!(matches!(cycle, PlanError::CycleDetected { .. }));
}

#[test]
fn test_rollup_and_parent_offer() {
    let mut board = board();
    let (doing, _) = board.create_list("Doing", 0).unwrap();
    let parent = task_in(&mut board, &doing, "Launch event");
    let s1 = subtask(&mut board, &parent, "Venue");
    let s2 = subtask(&mut board, &parent, "Catering");
    let s3 = subtask(&mut board, &parent, "Speakers");

    board.set_progress(&s2, 50).unwrap();
    board.complete_task(&s3).unwrap();
    assert_eq!(state(&board, &parent), (TaskStatus::Pending, 50));

    board.complete_task(&s1).unwrap();
    let outcome = board.complete_task(&s2).unwrap();
    assert_eq!(outcome.offers.len(), 1);
    assert!(outcome.offers[0].completed);
    assert_eq!(state(&board, &parent), (TaskStatus::Completed, 100));

    // moving the parent carries its subtasks along
    let (done, _) = board.create_list("Done", 1).unwrap();
    board
        .on_drag_end(&parent, DropTarget::list(done.clone(), 0))
        .unwrap();
    assert_eq!(titles(&board, &done), vec!["Launch event"]);
    assert_eq!(board.context().subtasks(&parent).len(), 3);
}

#[test]
fn test_list_deletion_policy() {
    let mut board = board();
    let (backlog, _) = board.create_list("Backlog", 0).unwrap();
    let (doing, _) = board.create_list("Doing", 1).unwrap();
    let a = task_in(&mut board, &backlog, "A");
    let b = task_in(&mut board, &doing, "B");
    board.add_dependency(&a, &b).unwrap();

    let err = board.delete_list(&backlog, None).unwrap_err();
    assert!(matches!(err, PlanError::ListNotEmpty { count: 1, .. }));
    assert_eq!(titles(&board, &backlog), vec!["A"]);

    let set = board
        .delete_list(&backlog, Some(DeleteListStrategy::CascadeDeleteTasks))
        .unwrap();
    assert!(set
        .iter()
        .any(|m| matches!(m, Mutation::RemoveDependency { .. })));
    assert!(set
        .iter()
        .any(|m| matches!(m, Mutation::DeleteTask { id } if id == &a)));
    assert!(!board.context().is_blocked(&b).unwrap());
    assert_eq!(board.context().lists_in_order().len(), 1);

    let (empty, _) = board.create_list("Empty", 0).unwrap();
    let set = board.delete_list(&empty, None).unwrap();
    assert_eq!(set.len(), 1);
}

#[test]
fn test_snapshot_json_survives_reload() {
    let mut board = board();
    let (doing, _) = board.create_list("Doing", 0).unwrap();
    let a = task_in(&mut board, &doing, "A");
    let b = task_in(&mut board, &doing, "B");
    subtask(&mut board, &a, "A.1");
    board.add_dependency(&a, &b).unwrap();

    let json = board.context().snapshot().to_json().unwrap();
    let snapshot = planboard::BoardSnapshot::from_json(&json).unwrap();
    let reloaded = PlanContext::from_snapshot(snapshot, PlannerSettings::default()).unwrap();
    assert_eq!(reloaded.snapshot(), board.context().snapshot());
    assert!(reloaded.is_blocked(&b).unwrap());
}
