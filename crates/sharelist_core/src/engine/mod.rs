//! Task mutation engine.
//!
//! # Responsibility
//! - Implement the task commands (add, toggle, sticky, edit, delete,
//!   promote, reorder) over the arena forest.
//! - Keep every cascade (completion, sticky) authoritative over the whole
//!   subtree with per-node history appends.
//!
//! # Invariants
//! - Commands run to completion before returning; no partial state is ever
//!   observable by callers.
//! - A task flipped back to active is relocated via insert-at-active-top
//!   within its current sibling sequence.
//! - Reorder rewrites exactly one completion partition of one container and
//!   leaves every other slot untouched.

pub mod annotate;

use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::forest::{Container, ForestError, TaskForest, TaskNode};
use crate::model::now_epoch_ms;
use crate::model::task::TaskId;

/// Result type for mutation commands.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from task mutation commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Task text is blank after trimming.
    EmptyText,
    /// Target task does not exist.
    TaskNotFound(TaskId),
    /// Reorder input does not cover exactly one completion partition.
    ReorderMismatch(String),
    /// Structural failure from the underlying forest.
    Forest(ForestError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "task text must not be blank"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::ReorderMismatch(message) => write!(f, "invalid reorder input: {message}"),
            Self::Forest(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Forest(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ForestError> for EngineError {
    fn from(value: ForestError) -> Self {
        match value {
            ForestError::TaskNotFound(id) => Self::TaskNotFound(id),
            other => Self::Forest(other),
        }
    }
}

/// Result of an add command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Id of the created or reactivated task.
    pub task_id: TaskId,
    /// True when a completed duplicate was reactivated instead of creating a
    /// new task.
    pub reactivated: bool,
}

/// Adds a task at the target level.
///
/// With an active focus the task becomes a subtask of the focused task.
/// A completed sibling whose normalized text matches is reactivated and
/// repositioned instead of duplicated; an active duplicate does not block a
/// new task.
pub fn add_task(
    forest: &mut TaskForest,
    text: &str,
    focus: Option<TaskId>,
) -> EngineResult<AddOutcome> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EngineError::EmptyText);
    }

    let container = match focus {
        Some(id) => {
            if !forest.contains(id) {
                return Err(EngineError::TaskNotFound(id));
            }
            Container::Task(id)
        }
        None => Container::Roots,
    };

    if let Some(existing) = forest.find_completed_by_text(container, trimmed)? {
        toggle_completion(forest, existing)?;
        return Ok(AddOutcome {
            task_id: existing,
            reactivated: true,
        });
    }

    let task_id = forest.insert_at_active_top(container, TaskNode::new(trimmed))?;
    Ok(AddOutcome {
        task_id,
        reactivated: false,
    })
}

/// Flips the completion flag of `id`; returns the new value.
///
/// The new value is forced onto every descendant, each appending to its own
/// history. A completed -> active flip relocates the task within its current
/// sibling sequence.
pub fn toggle_completion(forest: &mut TaskForest, id: TaskId) -> EngineResult<bool> {
    let now = now_epoch_ms();
    let new_value = {
        let node = forest.get_mut(id).ok_or(EngineError::TaskNotFound(id))?;
        let new_value = !node.completed;
        node.completed = new_value;
        record_completion(node, new_value, now);
        new_value
    };

    for descendant in forest.descendant_ids(id) {
        if let Some(node) = forest.get_mut(descendant) {
            node.completed = new_value;
            record_completion(node, new_value, now);
        }
    }

    if !new_value {
        let container = forest.container_of(id)?;
        forest.detach(id)?;
        forest.place_at_active_top(container, id)?;
    }
    Ok(new_value)
}

fn record_completion(node: &mut TaskNode, completed: bool, at: i64) {
    if completed {
        node.timestamps.completed_at.push(at);
    } else {
        node.timestamps.uncompleted_at.push(at);
    }
}

/// Flips the sticky flag of `id`; returns the new value.
///
/// The new value is forced onto every descendant, each appending to its own
/// sticky history. No relocation takes place.
pub fn toggle_sticky(forest: &mut TaskForest, id: TaskId) -> EngineResult<bool> {
    let now = now_epoch_ms();
    let new_value = {
        let node = forest.get_mut(id).ok_or(EngineError::TaskNotFound(id))?;
        node.sticky = !node.sticky;
        node.timestamps.sticky_toggled_at.push(now);
        node.sticky
    };

    for descendant in forest.descendant_ids(id) {
        if let Some(node) = forest.get_mut(descendant) {
            node.sticky = new_value;
            node.timestamps.sticky_toggled_at.push(now);
        }
    }
    Ok(new_value)
}

/// Replaces the text of `id`; returns whether anything changed.
pub fn edit_task(forest: &mut TaskForest, id: TaskId, new_text: &str) -> EngineResult<bool> {
    let trimmed = new_text.trim();
    if trimmed.is_empty() {
        return Err(EngineError::EmptyText);
    }
    let node = forest.get_mut(id).ok_or(EngineError::TaskNotFound(id))?;
    if node.text == trimmed {
        return Ok(false);
    }
    node.text = trimmed.to_string();
    node.timestamps.edited_at.push(now_epoch_ms());
    Ok(true)
}

/// Removes `id` and its whole subtree; returns the number of removed tasks.
///
/// There is no tombstone; removal is immediate and irreversible. The
/// pre-deletion instant is stamped on the task before it is discarded.
pub fn delete_task(forest: &mut TaskForest, id: TaskId) -> EngineResult<usize> {
    let node = forest.get_mut(id).ok_or(EngineError::TaskNotFound(id))?;
    node.timestamps.deleted_at = Some(now_epoch_ms());
    Ok(forest.remove_subtree(id)?)
}

/// Moves `id` up exactly one level; returns whether the task moved.
///
/// A top-level task is a successful no-op. A second-level task becomes a
/// top-level sibling of its former parent with its parent link cleared.
/// An active task re-enters the destination via insert-at-active-top; a
/// completed one is appended after the completed block.
pub fn promote_task(forest: &mut TaskForest, id: TaskId) -> EngineResult<bool> {
    let parent = match forest.get(id) {
        Some(node) => match node.parent {
            Some(parent) => parent,
            None => return Ok(false),
        },
        None => return Err(EngineError::TaskNotFound(id)),
    };

    let grandparent = forest
        .get(parent)
        .ok_or(EngineError::TaskNotFound(parent))?
        .parent;

    let destination = match grandparent {
        Some(grandparent) => Container::Task(grandparent),
        None => Container::Roots,
    };
    forest.detach(id)?;
    if forest.get(id).is_some_and(|node| node.completed) {
        forest.append(destination, id)?;
    } else {
        forest.place_at_active_top(destination, id)?;
    }
    Ok(true)
}

/// Rewrites one completion partition of `container` to match `ordered_ids`.
///
/// `ordered_ids` must list every member of either the active or the
/// completed subset exactly once. The listed tasks are rewritten into the
/// slots they already occupy, so the other partition and all unrelated
/// subtrees stay untouched.
pub fn reorder(
    forest: &mut TaskForest,
    container: Container,
    ordered_ids: &[TaskId],
) -> EngineResult<()> {
    if ordered_ids.is_empty() {
        return Ok(());
    }

    let sequence: Vec<TaskId> = forest.sequence(container)?.to_vec();
    let requested: HashSet<TaskId> = ordered_ids.iter().copied().collect();
    if requested.len() != ordered_ids.len() {
        return Err(EngineError::ReorderMismatch(
            "ordered ids contain duplicates".to_string(),
        ));
    }

    let partition_completed = forest
        .get(ordered_ids[0])
        .ok_or(EngineError::TaskNotFound(ordered_ids[0]))?
        .completed;
    for id in ordered_ids {
        let node = forest.get(*id).ok_or(EngineError::TaskNotFound(*id))?;
        if node.completed != partition_completed {
            return Err(EngineError::ReorderMismatch(
                "ordered ids span both completion partitions".to_string(),
            ));
        }
    }

    let mut slots = Vec::new();
    for (index, id) in sequence.iter().enumerate() {
        let in_partition = forest
            .get(*id)
            .is_some_and(|node| node.completed == partition_completed);
        if in_partition {
            if !requested.contains(id) {
                return Err(EngineError::ReorderMismatch(
                    "ordered ids do not cover the whole partition".to_string(),
                ));
            }
            slots.push(index);
        } else if requested.contains(id) {
            return Err(EngineError::ReorderMismatch(
                "ordered ids span both completion partitions".to_string(),
            ));
        }
    }
    if slots.len() != ordered_ids.len() {
        return Err(EngineError::ReorderMismatch(
            "ordered ids include tasks outside the container".to_string(),
        ));
    }

    let target = forest.sequence_mut(container)?;
    for (slot, id) in slots.into_iter().zip(ordered_ids.iter()) {
        target[slot] = *id;
    }
    Ok(())
}
