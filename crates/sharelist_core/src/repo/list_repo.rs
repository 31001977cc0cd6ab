//! Shared list repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist shared list documents keyed by their short share id.
//! - Keep SQL details and the `last_modified` stamping rule inside the
//!   repository boundary.
//!
//! # Invariants
//! - Every successful write replaces the full document and stamps
//!   `last_modified = max(previous + 1, now)`, so the value strictly
//!   increases across persisted writes.
//! - There is no conditional write; the last completed write wins entirely.

use crate::model::now_epoch_ms;
use crate::model::task::{
    is_valid_share_id, new_share_id, ListType, ShareId, SharedList, Task, TaskId,
};
use crate::repo::{tasks_from_json, tasks_to_json, RepoError, RepoResult};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

const SHARE_ID_ALLOC_ATTEMPTS: usize = 4;

/// Fields of a list creation request.
#[derive(Debug, Clone, Default)]
pub struct NewList {
    pub tasks: Vec<Task>,
    pub title: Option<String>,
    pub list_type: ListType,
}

/// Fields of a full-document list replace.
#[derive(Debug, Clone, Default)]
pub struct ListWrite {
    /// Replacement forest; always written.
    pub tasks: Vec<Task>,
    /// Focus pointer update: `None` leaves the stored pointer unchanged,
    /// `Some(None)` clears it, `Some(Some(id))` replaces it.
    pub focus_task_id: Option<Option<TaskId>>,
    /// New title; `None` leaves the stored title unchanged.
    pub title: Option<String>,
    /// New list type; `None` leaves the stored type unchanged.
    pub list_type: Option<ListType>,
}

/// Repository interface for shared list documents.
pub trait ListRepository {
    /// Creates a list under a fresh share id.
    fn create_list(&self, new_list: &NewList) -> RepoResult<ShareId>;
    /// Loads one list; `None` when the id is unknown.
    fn get_list(&self, list_id: &str) -> RepoResult<Option<SharedList>>;
    /// Replaces one list document; returns the stamped `last_modified`.
    fn put_list(&self, list_id: &str, write: &ListWrite) -> RepoResult<i64>;
    /// Deletes one list and purges it from every client's subscription set
    /// and pending markers.
    fn delete_list(&self, list_id: &str) -> RepoResult<()>;
    /// Reads only the `last_modified` marker; `None` when the id is unknown.
    fn last_modified(&self, list_id: &str) -> RepoResult<Option<i64>>;
    /// Returns whether the list still exists.
    fn list_exists(&self, list_id: &str) -> RepoResult<bool>;
}

/// SQLite-backed shared list repository.
pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn create_list(&self, new_list: &NewList) -> RepoResult<ShareId> {
        let tasks_json = tasks_to_json(&new_list.tasks)?;
        let now = now_epoch_ms();

        let mut last_err: Option<rusqlite::Error> = None;
        for _ in 0..SHARE_ID_ALLOC_ATTEMPTS {
            let list_id = new_share_id();
            let inserted = self.conn.execute(
                "INSERT INTO lists (
                    list_id,
                    title,
                    list_type,
                    tasks_json,
                    focus_task_id,
                    created_at,
                    last_modified
                ) VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5);",
                params![
                    list_id,
                    new_list.title.as_deref(),
                    list_type_to_db(new_list.list_type),
                    tasks_json,
                    now,
                ],
            );
            match inserted {
                Ok(_) => return Ok(list_id),
                Err(err) if is_constraint_violation(&err) => {
                    last_err = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        match last_err {
            Some(err) => Err(err.into()),
            None => Err(RepoError::InvalidData(
                "share id allocation failed".to_string(),
            )),
        }
    }

    fn get_list(&self, list_id: &str) -> RepoResult<Option<SharedList>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                list_id,
                title,
                list_type,
                tasks_json,
                focus_task_id,
                created_at,
                last_modified
             FROM lists
             WHERE list_id = ?1;",
        )?;
        let mut rows = stmt.query([list_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_list_row(row)?));
        }
        Ok(None)
    }

    fn put_list(&self, list_id: &str, write: &ListWrite) -> RepoResult<i64> {
        let tasks_json = tasks_to_json(&write.tasks)?;
        let set_focus = write.focus_task_id.is_some();
        let focus_value = write
            .focus_task_id
            .flatten()
            .map(|id| id.to_string());
        let changed = self.conn.execute(
            "UPDATE lists
             SET tasks_json = ?2,
                 focus_task_id = CASE WHEN ?3 = 1 THEN ?4 ELSE focus_task_id END,
                 title = COALESCE(?5, title),
                 list_type = COALESCE(?6, list_type),
                 last_modified = MAX(last_modified + 1, ?7)
             WHERE list_id = ?1;",
            params![
                list_id,
                tasks_json,
                i64::from(set_focus),
                focus_value,
                write.title.as_deref(),
                write.list_type.map(list_type_to_db),
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::ListNotFound(list_id.to_string()));
        }

        let stamped: i64 = self.conn.query_row(
            "SELECT last_modified FROM lists WHERE list_id = ?1;",
            [list_id],
            |row| row.get(0),
        )?;
        Ok(stamped)
    }

    fn delete_list(&self, list_id: &str) -> RepoResult<()> {
        // The list row and its cascade rows are removed atomically.
        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM lists WHERE list_id = ?1;", [list_id])?;
        if deleted == 0 {
            return Err(RepoError::ListNotFound(list_id.to_string()));
        }
        tx.execute("DELETE FROM subscriptions WHERE list_id = ?1;", [list_id])?;
        tx.execute(
            "DELETE FROM pending_subscriptions WHERE list_id = ?1;",
            [list_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn last_modified(&self, list_id: &str) -> RepoResult<Option<i64>> {
        let value = self
            .conn
            .query_row(
                "SELECT last_modified FROM lists WHERE list_id = ?1;",
                [list_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn list_exists(&self, list_id: &str) -> RepoResult<bool> {
        if !is_valid_share_id(list_id) {
            return Ok(false);
        }
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM lists WHERE list_id = ?1);",
            [list_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn parse_list_row(row: &Row<'_>) -> RepoResult<SharedList> {
    let list_id: String = row.get("list_id")?;
    let list_type_text: String = row.get("list_type")?;
    let list_type = parse_list_type(&list_type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid list type `{list_type_text}` in lists.list_type"
        ))
    })?;

    let tasks_json: String = row.get("tasks_json")?;
    let focus_task_id = row
        .get::<_, Option<String>>("focus_task_id")?
        .map(|value| {
            Uuid::parse_str(&value).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid focus task id `{value}` in lists.focus_task_id"
                ))
            })
        })
        .transpose()?;

    Ok(SharedList {
        list_id,
        title: row.get("title")?,
        list_type,
        tasks: tasks_from_json(&tasks_json)?,
        focus_task_id,
        created_at: row.get("created_at")?,
        last_modified: row.get("last_modified")?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
    )
}

fn list_type_to_db(list_type: ListType) -> &'static str {
    match list_type {
        ListType::General => "general",
        ListType::Grocery => "grocery",
        ListType::Schedule => "schedule",
    }
}

fn parse_list_type(value: &str) -> Option<ListType> {
    match value {
        "general" => Some(ListType::General),
        "grocery" => Some(ListType::Grocery),
        "schedule" => Some(ListType::Schedule),
        _ => None,
    }
}
