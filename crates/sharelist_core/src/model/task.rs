//! Task and shared list domain records.
//!
//! # Responsibility
//! - Define the wire/persistence shape of tasks, documents and shared lists.
//! - Generate stable task ids and short share ids.
//!
//! # Invariants
//! - `TaskId` values are never reused for another task.
//! - A share id is exactly eight lowercase hex characters.
//! - Timestamp histories are append-only; entries are epoch milliseconds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::now_epoch_ms;

/// Stable identifier for a task node.
pub type TaskId = Uuid;

/// Short public identifier of a shared list (8 lowercase hex characters).
pub type ShareId = String;

/// Version stamped on every persisted task document.
pub const SCHEMA_VERSION: u32 = 1;

const SHARE_ID_LEN: usize = 8;

/// Generates a fresh share id from a random uuid.
pub fn new_share_id() -> ShareId {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..SHARE_ID_LEN].to_string()
}

/// Returns whether `value` is a well-formed share id.
pub fn is_valid_share_id(value: &str) -> bool {
    value.len() == SHARE_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Category tag carried by a shared list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    /// Plain task list.
    #[default]
    General,
    /// Grocery list eligible for store/aisle annotation.
    Grocery,
    /// Time-oriented list eligible for schedule annotation.
    Schedule,
}

/// Append-only activity record attached to every task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskTimestamps {
    /// Creation instant, epoch ms.
    pub created_at: i64,
    /// Instants of active -> completed flips.
    pub completed_at: Vec<i64>,
    /// Instants of completed -> active flips.
    pub uncompleted_at: Vec<i64>,
    /// Instants of text edits.
    pub edited_at: Vec<i64>,
    /// Instants of sticky flag flips.
    pub sticky_toggled_at: Vec<i64>,
    /// Instant recorded immediately before the task is discarded.
    ///
    /// The node is removed right after this is set, so the value never
    /// reaches storage. Kept for parity with the activity histories.
    pub deleted_at: Option<i64>,
}

impl TaskTimestamps {
    /// Creates a record stamped with the current instant.
    pub fn now() -> Self {
        Self {
            created_at: now_epoch_ms(),
            ..Self::default()
        }
    }
}

/// One node of a task tree in its nested wire shape.
///
/// `parent_id` is a weak back-reference; the nesting of `subtasks` is the
/// authoritative structure and wins when the two disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable task id.
    pub id: TaskId,
    /// Display text.
    pub text: String,
    /// Completion flag; authoritative over the whole subtree when toggled.
    #[serde(default)]
    pub completed: bool,
    /// Sticky tasks join every personal date view.
    #[serde(default)]
    pub sticky: bool,
    /// Ordered child tasks; insertion order is meaningful.
    #[serde(default)]
    pub subtasks: Vec<Task>,
    /// Id of the parent task, `None` for top-level tasks.
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    /// Activity record.
    #[serde(default)]
    pub timestamps: TaskTimestamps,
    /// Store section assigned by the external annotator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Display rank assigned by the external annotator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_index: Option<i64>,
    /// Suggested time slot assigned by the external annotator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
}

impl Task {
    /// Creates a new active, non-sticky task with a generated id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            completed: false,
            sticky: false,
            subtasks: Vec::new(),
            parent_id: None,
            timestamps: TaskTimestamps::now(),
            location: None,
            location_index: None,
            scheduled_time: None,
        }
    }
}

/// Versioned envelope wrapped around every persisted task forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    /// Document schema version; see [`SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Top-level task forest.
    pub tasks: Vec<Task>,
}

impl TaskDocument {
    /// Wraps a forest in the current schema version.
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            tasks,
        }
    }
}

/// A task forest published under a short share id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedList {
    /// Public share id.
    pub list_id: ShareId,
    /// Optional display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Category tag.
    #[serde(default)]
    pub list_type: ListType,
    /// Top-level task forest.
    pub tasks: Vec<Task>,
    /// Optional single focus pointer.
    ///
    /// The client-side navigator supports multi-level focus; only one level
    /// is persisted here, and deep focus state is never synced from remote.
    #[serde(default)]
    pub focus_task_id: Option<TaskId>,
    /// Creation instant, epoch ms.
    pub created_at: i64,
    /// Sole conflict-resolution signal; strictly increases on every write.
    pub last_modified: i64,
}

#[cfg(test)]
mod tests {
    use super::{is_valid_share_id, new_share_id, Task, TaskDocument, SCHEMA_VERSION};

    #[test]
    fn share_ids_are_eight_hex_chars() {
        for _ in 0..32 {
            let id = new_share_id();
            assert!(is_valid_share_id(&id), "bad share id: {id}");
        }
        assert!(!is_valid_share_id("abc"));
        assert!(!is_valid_share_id("ABCDEF01"));
        assert!(!is_valid_share_id("ghijklmn"));
    }

    #[test]
    fn new_task_is_active_and_not_sticky() {
        let task = Task::new("Buy milk");
        assert!(!task.completed);
        assert!(!task.sticky);
        assert!(task.subtasks.is_empty());
        assert!(task.timestamps.created_at > 0);
        assert!(task.timestamps.completed_at.is_empty());
    }

    #[test]
    fn document_envelope_round_trips_with_version() {
        let doc = TaskDocument::new(vec![Task::new("a")]);
        let json = serde_json::to_string(&doc).expect("serialize");
        assert!(json.contains("\"schemaVersion\""));
        let parsed: TaskDocument = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed.schema_version, SCHEMA_VERSION);
        assert_eq!(parsed.tasks[0].text, "a");
    }
}
