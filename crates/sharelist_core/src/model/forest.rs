//! Arena-backed task forest.
//!
//! # Responsibility
//! - Hold tasks in an id-keyed arena with explicit parent/child links.
//! - Provide the structural primitives shared by all mutation commands.
//!
//! # Invariants
//! - Every node id appears in exactly one sibling sequence (a parent's
//!   `children` or the top-level `roots`); no sharing, no cycles.
//! - Sibling sequences never contain duplicates or dangling ids.
//! - `insert-at-active-top` is the single ordering primitive: a placed task
//!   lands immediately before the first completed sibling, or at the end.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::task::{Task, TaskId, TaskTimestamps};

/// Result type for forest structure operations.
pub type ForestResult<T> = Result<T, ForestError>;

/// Errors from forest construction and structural edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestError {
    /// The same task id appeared twice in one input tree.
    DuplicateTaskId(TaskId),
    /// Target task does not exist in this forest.
    TaskNotFound(TaskId),
}

impl Display for ForestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateTaskId(id) => write!(f, "duplicate task id in tree: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
        }
    }
}

impl Error for ForestError {}

/// One sibling sequence: the top-level forest or a task's subtask list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// The top-level forest.
    Roots,
    /// The subtask sequence of one task.
    Task(TaskId),
}

/// Arena node; children are held as ordered ids, not owned values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub sticky: bool,
    pub parent: Option<TaskId>,
    pub children: Vec<TaskId>,
    pub timestamps: TaskTimestamps,
    pub location: Option<String>,
    pub location_index: Option<i64>,
    pub scheduled_time: Option<String>,
}

impl TaskNode {
    /// Creates a fresh active, non-sticky node with no children.
    pub fn new(text: impl Into<String>) -> Self {
        let task = Task::new(text);
        Self {
            id: task.id,
            text: task.text,
            completed: false,
            sticky: false,
            parent: None,
            children: Vec::new(),
            timestamps: task.timestamps,
            location: None,
            location_index: None,
            scheduled_time: None,
        }
    }
}

/// Id-keyed task arena with an ordered top-level sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForest {
    nodes: HashMap<TaskId, TaskNode>,
    roots: Vec<TaskId>,
}

impl TaskForest {
    /// Creates an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a forest from the nested wire shape.
    ///
    /// The nesting is authoritative: parent links are derived from structure
    /// and any stored `parent_id` back-references are ignored.
    pub fn from_tasks(tasks: Vec<Task>) -> ForestResult<Self> {
        let mut forest = Self::new();
        let mut work: Vec<(Task, Option<TaskId>)> = Vec::new();
        for task in tasks {
            forest.roots.push(task.id);
            work.push((task, None));
        }

        while let Some((task, parent)) = work.pop() {
            if forest.nodes.contains_key(&task.id) {
                return Err(ForestError::DuplicateTaskId(task.id));
            }
            let node = TaskNode {
                id: task.id,
                text: task.text,
                completed: task.completed,
                sticky: task.sticky,
                parent,
                children: task.subtasks.iter().map(|child| child.id).collect(),
                timestamps: task.timestamps,
                location: task.location,
                location_index: task.location_index,
                scheduled_time: task.scheduled_time,
            };
            let id = node.id;
            forest.nodes.insert(id, node);
            for child in task.subtasks {
                work.push((child, Some(id)));
            }
        }
        Ok(forest)
    }

    /// Renders the forest back to the nested wire shape.
    pub fn to_tasks(&self) -> Vec<Task> {
        self.roots
            .iter()
            .filter_map(|id| self.build_task(*id))
            .collect()
    }

    fn build_task(&self, id: TaskId) -> Option<Task> {
        let node = self.nodes.get(&id)?;
        Some(Task {
            id: node.id,
            text: node.text.clone(),
            completed: node.completed,
            sticky: node.sticky,
            subtasks: node
                .children
                .iter()
                .filter_map(|child| self.build_task(*child))
                .collect(),
            parent_id: node.parent,
            timestamps: node.timestamps.clone(),
            location: node.location.clone(),
            location_index: node.location_index,
            scheduled_time: node.scheduled_time.clone(),
        })
    }

    /// Total number of tasks in the forest.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the forest holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ordered top-level task ids.
    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    /// Returns whether the forest contains `id`.
    pub fn contains(&self, id: TaskId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns one node by id.
    pub fn get(&self, id: TaskId) -> Option<&TaskNode> {
        self.nodes.get(&id)
    }

    /// Returns one node by id for in-place mutation.
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskNode> {
        self.nodes.get_mut(&id)
    }

    /// Returns the container holding `id`.
    pub fn container_of(&self, id: TaskId) -> ForestResult<Container> {
        let node = self.nodes.get(&id).ok_or(ForestError::TaskNotFound(id))?;
        Ok(match node.parent {
            Some(parent) => Container::Task(parent),
            None => Container::Roots,
        })
    }

    /// Ordered sibling sequence of one container.
    pub fn sequence(&self, container: Container) -> ForestResult<&[TaskId]> {
        match container {
            Container::Roots => Ok(&self.roots),
            Container::Task(id) => self
                .nodes
                .get(&id)
                .map(|node| node.children.as_slice())
                .ok_or(ForestError::TaskNotFound(id)),
        }
    }

    pub(crate) fn sequence_mut(&mut self, container: Container) -> ForestResult<&mut Vec<TaskId>> {
        match container {
            Container::Roots => Ok(&mut self.roots),
            Container::Task(id) => self
                .nodes
                .get_mut(&id)
                .map(|node| &mut node.children)
                .ok_or(ForestError::TaskNotFound(id)),
        }
    }

    fn parent_for(container: Container) -> Option<TaskId> {
        match container {
            Container::Roots => None,
            Container::Task(id) => Some(id),
        }
    }

    /// Adds a new node and places it at the active top of `container`.
    pub fn insert_at_active_top(
        &mut self,
        container: Container,
        mut node: TaskNode,
    ) -> ForestResult<TaskId> {
        if self.nodes.contains_key(&node.id) {
            return Err(ForestError::DuplicateTaskId(node.id));
        }
        // Validate the container before the node enters the arena.
        self.sequence(container)?;
        node.parent = Self::parent_for(container);
        let id = node.id;
        self.nodes.insert(id, node);
        self.place_at_active_top(container, id)?;
        Ok(id)
    }

    /// Positions a detached existing node at the active top of `container`.
    ///
    /// The slot is immediately before the first completed sibling, or the end
    /// of the sequence when no sibling is completed.
    pub fn place_at_active_top(&mut self, container: Container, id: TaskId) -> ForestResult<()> {
        if !self.nodes.contains_key(&id) {
            return Err(ForestError::TaskNotFound(id));
        }
        let slot = {
            let sequence = self.sequence(container)?;
            sequence
                .iter()
                .position(|sibling| self.nodes.get(sibling).is_some_and(|node| node.completed))
                .unwrap_or(sequence.len())
        };
        self.sequence_mut(container)?.insert(slot, id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Self::parent_for(container);
        }
        Ok(())
    }

    /// Appends a detached existing node to the end of `container`.
    pub fn append(&mut self, container: Container, id: TaskId) -> ForestResult<()> {
        if !self.nodes.contains_key(&id) {
            return Err(ForestError::TaskNotFound(id));
        }
        self.sequence_mut(container)?.push(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Self::parent_for(container);
        }
        Ok(())
    }

    /// Removes `id` from its sibling sequence without dropping the node.
    ///
    /// The node must be re-placed before the forest is rendered, otherwise it
    /// is unreachable from the roots.
    pub fn detach(&mut self, id: TaskId) -> ForestResult<()> {
        let container = self.container_of(id)?;
        self.sequence_mut(container)?.retain(|entry| *entry != id);
        Ok(())
    }

    /// Ids of all descendants of `id` (excluding `id`), in traversal order.
    pub fn descendant_ids(&self, id: TaskId) -> Vec<TaskId> {
        let mut result = Vec::new();
        let mut work: Vec<TaskId> = match self.nodes.get(&id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => Vec::new(),
        };
        while let Some(current) = work.pop() {
            result.push(current);
            if let Some(node) = self.nodes.get(&current) {
                work.extend(node.children.iter().rev().copied());
            }
        }
        result
    }

    /// Removes `id` and its whole subtree; returns the number of removed
    /// tasks.
    pub fn remove_subtree(&mut self, id: TaskId) -> ForestResult<usize> {
        self.detach(id)?;
        let mut removed = 0;
        let mut work = vec![id];
        while let Some(current) = work.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                removed += 1;
                work.extend(node.children);
            }
        }
        Ok(removed)
    }

    /// Finds a completed sibling in `container` whose normalized text equals
    /// the normalized `text`.
    pub fn find_completed_by_text(
        &self,
        container: Container,
        text: &str,
    ) -> ForestResult<Option<TaskId>> {
        let needle = normalize_text(text);
        let found = self
            .sequence(container)?
            .iter()
            .copied()
            .find(|id| match self.nodes.get(id) {
                Some(node) => node.completed && normalize_text(&node.text) == needle,
                None => false,
            });
        Ok(found)
    }
}

/// Normalization used for duplicate detection: trimmed, case-insensitive.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}
