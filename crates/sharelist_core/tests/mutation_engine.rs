use sharelist_core::engine::{
    add_task, delete_task, edit_task, promote_task, reorder, toggle_completion, toggle_sticky,
    EngineError,
};
use sharelist_core::{Container, Task, TaskForest};

fn forest_of(texts: &[&str]) -> TaskForest {
    TaskForest::from_tasks(texts.iter().map(|text| Task::new(*text)).collect()).unwrap()
}

#[test]
fn add_creates_task_at_active_top() {
    let mut forest = forest_of(&["a", "b"]);
    let (a, b) = (forest.roots()[0], forest.roots()[1]);
    toggle_completion(&mut forest, b).unwrap();

    let outcome = add_task(&mut forest, "  Buy milk  ", None).unwrap();
    assert!(!outcome.reactivated);

    let node = forest.get(outcome.task_id).unwrap();
    assert_eq!(node.text, "Buy milk");
    assert!(!node.completed);
    // New task lands before the completed block, after the active one.
    assert_eq!(forest.roots(), &[a, outcome.task_id, b]);
}

#[test]
fn add_to_an_empty_forest_creates_one_active_task() {
    let mut forest = TaskForest::new();
    let outcome = add_task(&mut forest, "Buy milk", None).unwrap();
    assert!(!outcome.reactivated);
    assert_eq!(forest.len(), 1);

    let node = forest.get(outcome.task_id).unwrap();
    assert_eq!(node.text, "Buy milk");
    assert!(!node.completed);
    assert!(!node.sticky);
    assert!(node.children.is_empty());
}

#[test]
fn add_rejects_blank_text() {
    let mut forest = TaskForest::new();
    assert_eq!(add_task(&mut forest, "   ", None).unwrap_err(), EngineError::EmptyText);
    assert!(forest.is_empty());
}

#[test]
fn add_reactivates_completed_duplicate_case_insensitively() {
    let mut forest = forest_of(&["Buy milk", "other"]);
    let milk = forest.roots()[0];
    toggle_completion(&mut forest, milk).unwrap();

    let outcome = add_task(&mut forest, "  bUY MILK ", None).unwrap();
    assert!(outcome.reactivated);
    assert_eq!(outcome.task_id, milk);

    let node = forest.get(milk).unwrap();
    assert!(!node.completed);
    assert_eq!(node.timestamps.completed_at.len(), 1);
    assert_eq!(node.timestamps.uncompleted_at.len(), 1);
    assert_eq!(forest.len(), 2);
}

#[test]
fn active_duplicate_does_not_block_a_new_task() {
    let mut forest = forest_of(&["Buy milk"]);
    let outcome = add_task(&mut forest, "Buy milk", None).unwrap();
    assert!(!outcome.reactivated);
    assert_eq!(forest.len(), 2);
}

#[test]
fn add_with_focus_creates_a_subtask() {
    let mut forest = forest_of(&["parent"]);
    let parent = forest.roots()[0];

    let outcome = add_task(&mut forest, "child", Some(parent)).unwrap();
    assert_eq!(forest.get(outcome.task_id).unwrap().parent, Some(parent));
    assert_eq!(forest.sequence(Container::Task(parent)).unwrap(), &[outcome.task_id]);
    assert_eq!(forest.roots(), &[parent]);
}

#[test]
fn completion_cascades_down_with_per_node_history() {
    let mut child = Task::new("child");
    child.subtasks.push(Task::new("grandchild"));
    let mut root = Task::new("root");
    root.subtasks.push(child.clone());
    let grandchild_id = child.subtasks[0].id;
    let mut forest = TaskForest::from_tasks(vec![root.clone()]).unwrap();

    assert!(toggle_completion(&mut forest, root.id).unwrap());
    for id in [root.id, child.id, grandchild_id] {
        let node = forest.get(id).unwrap();
        assert!(node.completed);
        assert_eq!(node.timestamps.completed_at.len(), 1);
    }

    // Completing an already-completed descendant's parent again appends
    // unconditionally on the way back up.
    assert!(!toggle_completion(&mut forest, root.id).unwrap());
    for id in [root.id, child.id, grandchild_id] {
        let node = forest.get(id).unwrap();
        assert!(!node.completed);
        assert_eq!(node.timestamps.uncompleted_at.len(), 1);
    }
}

#[test]
fn reactivated_task_is_relocated_to_the_active_top() {
    let mut forest = forest_of(&["a", "b"]);
    let (a, b) = (forest.roots()[0], forest.roots()[1]);
    toggle_completion(&mut forest, b).unwrap();
    toggle_completion(&mut forest, a).unwrap();
    assert_eq!(forest.roots(), &[a, b]);

    // b flips back to active and moves before the completed block.
    toggle_completion(&mut forest, b).unwrap();
    assert_eq!(forest.roots(), &[b, a]);
}

#[test]
fn sticky_cascades_without_relocation() {
    let mut root = Task::new("root");
    root.subtasks.push(Task::new("child"));
    let child_id = root.subtasks[0].id;
    let mut forest = TaskForest::from_tasks(vec![root.clone(), Task::new("other")]).unwrap();

    assert!(toggle_sticky(&mut forest, root.id).unwrap());
    assert!(forest.get(child_id).unwrap().sticky);
    assert_eq!(forest.get(child_id).unwrap().timestamps.sticky_toggled_at.len(), 1);
    assert_eq!(forest.roots()[0], root.id);

    assert!(!toggle_sticky(&mut forest, root.id).unwrap());
    assert!(!forest.get(child_id).unwrap().sticky);
}

#[test]
fn edit_is_a_noop_for_identical_text() {
    let mut forest = forest_of(&["draft"]);
    let id = forest.roots()[0];

    assert!(!edit_task(&mut forest, id, "  draft ").unwrap());
    assert!(forest.get(id).unwrap().timestamps.edited_at.is_empty());

    assert!(edit_task(&mut forest, id, "final").unwrap());
    assert_eq!(forest.get(id).unwrap().text, "final");
    assert_eq!(forest.get(id).unwrap().timestamps.edited_at.len(), 1);
}

#[test]
fn delete_removes_the_subtree_and_reports_the_count() {
    let mut root = Task::new("root");
    root.subtasks.push(Task::new("x"));
    root.subtasks.push(Task::new("y"));
    let mut forest = TaskForest::from_tasks(vec![root.clone(), Task::new("kept")]).unwrap();

    assert_eq!(delete_task(&mut forest, root.id).unwrap(), 3);
    assert_eq!(forest.len(), 1);
    assert!(matches!(
        delete_task(&mut forest, root.id),
        Err(EngineError::TaskNotFound(_))
    ));
}

#[test]
fn promote_moves_exactly_one_level_per_call() {
    let mut b = Task::new("b");
    b.subtasks.push(Task::new("c"));
    let mut a = Task::new("a");
    a.subtasks.push(b.clone());
    let c_id = b.subtasks[0].id;
    let mut forest = TaskForest::from_tasks(vec![a.clone()]).unwrap();

    assert!(promote_task(&mut forest, c_id).unwrap());
    assert_eq!(forest.get(c_id).unwrap().parent, Some(a.id));
    assert_eq!(forest.sequence(Container::Task(a.id)).unwrap(), &[b.id, c_id]);

    assert!(promote_task(&mut forest, c_id).unwrap());
    assert_eq!(forest.get(c_id).unwrap().parent, None);
    assert_eq!(forest.roots(), &[a.id, c_id]);

    // Top level is a successful no-op.
    assert!(!promote_task(&mut forest, c_id).unwrap());
    assert_eq!(forest.roots(), &[a.id, c_id]);
}

#[test]
fn promoted_active_task_lands_before_the_completed_block() {
    let mut parent = Task::new("parent");
    parent.subtasks.push(Task::new("child"));
    let child_id = parent.subtasks[0].id;
    let mut forest = TaskForest::from_tasks(vec![parent.clone(), Task::new("done")]).unwrap();
    let done = forest.roots()[1];
    toggle_completion(&mut forest, done).unwrap();

    assert!(promote_task(&mut forest, child_id).unwrap());
    assert_eq!(forest.roots(), &[parent.id, child_id, done]);
    assert_eq!(forest.get(child_id).unwrap().parent, None);
}

#[test]
fn promoted_completed_task_joins_the_completed_block() {
    let mut parent = Task::new("parent");
    parent.subtasks.push(Task::new("child"));
    let child_id = parent.subtasks[0].id;
    let mut forest = TaskForest::from_tasks(vec![parent.clone(), Task::new("active")]).unwrap();
    let active = forest.roots()[1];
    toggle_completion(&mut forest, child_id).unwrap();

    assert!(promote_task(&mut forest, child_id).unwrap());
    assert_eq!(forest.roots(), &[parent.id, active, child_id]);
}

#[test]
fn reorder_rewrites_one_partition_and_leaves_the_other_in_place() {
    let mut forest = forest_of(&["a1", "c1", "a2", "c2"]);
    let ids: Vec<_> = forest.roots().to_vec();
    toggle_completion(&mut forest, ids[1]).unwrap();
    toggle_completion(&mut forest, ids[3]).unwrap();
    assert_eq!(forest.roots(), &[ids[0], ids[1], ids[2], ids[3]]);

    reorder(&mut forest, Container::Roots, &[ids[2], ids[0]]).unwrap();
    assert_eq!(forest.roots(), &[ids[2], ids[1], ids[0], ids[3]]);

    reorder(&mut forest, Container::Roots, &[ids[3], ids[1]]).unwrap();
    assert_eq!(forest.roots(), &[ids[2], ids[3], ids[0], ids[1]]);
}

#[test]
fn reorder_rejects_partial_mixed_or_duplicated_input() {
    let mut forest = forest_of(&["a1", "a2", "c1"]);
    let ids: Vec<_> = forest.roots().to_vec();
    toggle_completion(&mut forest, ids[2]).unwrap();

    assert!(matches!(
        reorder(&mut forest, Container::Roots, &[ids[0]]),
        Err(EngineError::ReorderMismatch(_))
    ));
    assert!(matches!(
        reorder(&mut forest, Container::Roots, &[ids[0], ids[2]]),
        Err(EngineError::ReorderMismatch(_))
    ));
    assert!(matches!(
        reorder(&mut forest, Container::Roots, &[ids[0], ids[0]]),
        Err(EngineError::ReorderMismatch(_))
    ));
    // The failed calls left the order untouched.
    assert_eq!(forest.roots(), &[ids[0], ids[1], ids[2]]);

    reorder(&mut forest, Container::Roots, &[]).unwrap();
    assert_eq!(forest.roots(), &[ids[0], ids[1], ids[2]]);
}
