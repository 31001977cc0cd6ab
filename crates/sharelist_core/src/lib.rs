//! Core domain logic for ShareList.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod engine;
pub mod focus;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;
pub mod sync;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use focus::{Breadcrumb, FocusNavigator, RootJump, ViewContext};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::forest::{Container, ForestError, TaskForest};
pub use model::task::{ListType, ShareId, SharedList, Task, TaskDocument, TaskId};
pub use repo::index_repo::{
    IndexRepository, PendingSubscription, SqliteIndexRepository, SubscriptionEntry,
};
pub use repo::list_repo::{ListRepository, ListWrite, NewList, SqliteListRepository};
pub use repo::personal_repo::{PersonalRepository, SqlitePersonalRepository};
pub use repo::{RepoError, RepoResult};
pub use service::share_service::{ShareOutcome, ShareService};
pub use session::{ClientSession, SessionConfig, SessionError, SessionResult};
pub use sync::topic::ListEvent;
pub use sync::SyncEngine;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
