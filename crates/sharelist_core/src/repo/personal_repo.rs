//! Personal date-view repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the per-(client, date) document and the per-client sticky
//!   overlay as separate partitions.
//! - Assemble the deduplicated union on load.
//!
//! # Invariants
//! - Sticky membership is decided per top-level task only; subtask
//!   stickiness never changes where the top-level ancestor is filed.
//! - On load, a task id present in both partitions resolves to the
//!   date-specific copy.
//! - A missing document reads as an empty forest, never as an error.

use crate::model::now_epoch_ms;
use crate::model::task::{Task, TaskId};
use crate::repo::{tasks_from_json, tasks_to_json, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

/// Repository interface for personal date-scoped task views.
pub trait PersonalRepository {
    /// Loads the union of the date document and the sticky overlay.
    fn load(&self, client_id: &str, date: &str) -> RepoResult<Vec<Task>>;
    /// Partitions `tasks` by top-level sticky flag and replaces both
    /// documents.
    fn save(&self, client_id: &str, date: &str, tasks: &[Task]) -> RepoResult<()>;
}

/// SQLite-backed personal view repository.
pub struct SqlitePersonalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonalRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_doc(&self, sql: &str, keys: &[&str]) -> RepoResult<Vec<Task>> {
        let raw: Option<String> = match keys {
            [a] => self.conn.query_row(sql, [a], |row| row.get(0)).optional()?,
            [a, b] => self
                .conn
                .query_row(sql, [a, b], |row| row.get(0))
                .optional()?,
            _ => None,
        };
        match raw {
            Some(raw) => tasks_from_json(&raw),
            None => Ok(Vec::new()),
        }
    }
}

impl PersonalRepository for SqlitePersonalRepository<'_> {
    fn load(&self, client_id: &str, date: &str) -> RepoResult<Vec<Task>> {
        let dated = self.load_doc(
            "SELECT tasks_json FROM personal_docs WHERE client_id = ?1 AND date = ?2;",
            &[client_id, date],
        )?;
        let sticky = self.load_doc(
            "SELECT tasks_json FROM sticky_docs WHERE client_id = ?1;",
            &[client_id],
        )?;

        let mut seen: HashSet<TaskId> = dated.iter().map(|task| task.id).collect();
        let mut merged = dated;
        for task in sticky {
            // The date-specific copy wins when both partitions hold the id.
            if seen.insert(task.id) {
                merged.push(task);
            }
        }
        Ok(merged)
    }

    fn save(&self, client_id: &str, date: &str, tasks: &[Task]) -> RepoResult<()> {
        let (sticky, dated): (Vec<Task>, Vec<Task>) =
            tasks.iter().cloned().partition(|task| task.sticky);
        let now = now_epoch_ms();

        self.conn.execute(
            "INSERT INTO personal_docs (client_id, date, tasks_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (client_id, date)
             DO UPDATE SET tasks_json = excluded.tasks_json,
                           updated_at = excluded.updated_at;",
            params![client_id, date, tasks_to_json(&dated)?, now],
        )?;
        self.conn.execute(
            "INSERT INTO sticky_docs (client_id, tasks_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (client_id)
             DO UPDATE SET tasks_json = excluded.tasks_json,
                           updated_at = excluded.updated_at;",
            params![client_id, tasks_to_json(&sticky)?, now],
        )?;
        Ok(())
    }
}
