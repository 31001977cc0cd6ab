//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for list documents,
//!   personal date views and the ownership/subscription indices.
//! - Isolate SQLite query details from service/sync orchestration.
//!
//! # Invariants
//! - Every persisted forest is a full-document replace of a versioned JSON
//!   envelope; partial task updates never reach storage.
//! - Repository APIs return semantic errors (`ListNotFound`) in addition to
//!   DB transport errors.

pub mod index_repo;
pub mod list_repo;
pub mod personal_repo;

use crate::db::DbError;
use crate::model::task::{ShareId, Task, TaskDocument, SCHEMA_VERSION};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors shared by the persistence repositories.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap failure.
    Db(DbError),
    /// Target shared list does not exist.
    ListNotFound(ShareId),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ListNotFound(id) => write!(f, "shared list not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted list data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::ListNotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Serializes a forest into the versioned document envelope.
pub(crate) fn tasks_to_json(tasks: &[Task]) -> RepoResult<String> {
    serde_json::to_string(&TaskDocument::new(tasks.to_vec()))
        .map_err(|err| RepoError::InvalidData(format!("task document encode failed: {err}")))
}

/// Parses a stored document envelope, rejecting unknown schema versions.
pub(crate) fn tasks_from_json(raw: &str) -> RepoResult<Vec<Task>> {
    let document: TaskDocument = serde_json::from_str(raw)
        .map_err(|err| RepoError::InvalidData(format!("task document decode failed: {err}")))?;
    if document.schema_version != SCHEMA_VERSION {
        return Err(RepoError::InvalidData(format!(
            "unsupported task document schema version {}",
            document.schema_version
        )));
    }
    Ok(document.tasks)
}
