//! Focus navigation state machine.
//!
//! # Responsibility
//! - Maintain the breadcrumb stack that restricts the view to one subtree.
//! - Derive the active sibling sequence for the current focus.
//!
//! # Invariants
//! - The stack never contains a duplicate task id; re-focusing an id
//!   already on the stack is rejected.
//! - An empty stack means the root view.
//! - Depth is bounded only by tree depth and cycle rejection.

use crate::model::forest::{Container, ForestResult, TaskForest};
use crate::model::task::{ShareId, TaskId};
use crate::repo::index_repo::PendingSubscription;

/// One breadcrumb on the focus stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub task_id: TaskId,
    pub title: String,
}

/// Which tree the navigator is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewContext {
    /// The client's own date-scoped view.
    Personal { date: String },
    /// A shared list owned by this client, mirrored to a personal date.
    OwnedList { list_id: ShareId, date: String },
    /// A shared list owned by someone else.
    VisitedList {
        list_id: ShareId,
        title: Option<String>,
        url: String,
    },
}

/// Outcome of a jump to the root view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootJump {
    /// The active tree was already personal or owned; nothing to record.
    Stayed,
    /// The active tree was a visited shared list: the caller must persist
    /// the pending-subscription marker and redirect to the personal view.
    LeftSharedView(PendingSubscription),
}

/// Breadcrumb stack plus the context of the currently viewed tree.
#[derive(Debug, Clone)]
pub struct FocusNavigator {
    stack: Vec<Breadcrumb>,
    context: ViewContext,
}

impl FocusNavigator {
    /// Creates a navigator at the root of `context`.
    pub fn new(context: ViewContext) -> Self {
        Self {
            stack: Vec::new(),
            context,
        }
    }

    /// Currently viewed tree.
    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    /// Switches to another tree and resets the stack to the root view.
    pub fn set_context(&mut self, context: ViewContext) {
        self.context = context;
        self.stack.clear();
    }

    /// Current breadcrumb trail, outermost first.
    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.stack
    }

    /// Returns whether the root view is active.
    pub fn is_root(&self) -> bool {
        self.stack.is_empty()
    }

    /// Id of the focused task, `None` at root.
    pub fn current_focus(&self) -> Option<TaskId> {
        self.stack.last().map(|crumb| crumb.task_id)
    }

    /// Zooms into one task's subtree.
    ///
    /// Returns `false` when `task_id` is already the top of the stack or
    /// appears anywhere in the trail (cycle rejection).
    pub fn focus(&mut self, task_id: TaskId, title: impl Into<String>) -> bool {
        if self.stack.iter().any(|crumb| crumb.task_id == task_id) {
            return false;
        }
        self.stack.push(Breadcrumb {
            task_id,
            title: title.into(),
        });
        true
    }

    /// Truncates the trail so that breadcrumb `index` becomes the focus.
    ///
    /// Leaves exactly `index + 1` entries; an out-of-range index keeps the
    /// trail unchanged.
    pub fn jump_to_breadcrumb(&mut self, index: usize) {
        if index + 1 <= self.stack.len() {
            self.stack.truncate(index + 1);
        }
    }

    /// Clears the trail back to the root view.
    ///
    /// When the active tree is a visited shared list, the returned value
    /// carries the pending-subscription marker the caller must persist
    /// before redirecting to the personal view.
    pub fn jump_to_root(&mut self) -> RootJump {
        self.stack.clear();
        match &self.context {
            ViewContext::VisitedList {
                list_id,
                title,
                url,
            } => RootJump::LeftSharedView(PendingSubscription {
                list_id: list_id.clone(),
                title: title.clone(),
                url: url.clone(),
            }),
            _ => RootJump::Stayed,
        }
    }

    /// Sibling sequence visible under the current focus.
    pub fn active_sequence<'forest>(
        &self,
        forest: &'forest TaskForest,
    ) -> ForestResult<&'forest [TaskId]> {
        match self.current_focus() {
            Some(id) => forest.sequence(Container::Task(id)),
            None => forest.sequence(Container::Roots),
        }
    }
}
