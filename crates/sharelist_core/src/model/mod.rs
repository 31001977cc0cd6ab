//! Domain model for task lists and shared list documents.
//!
//! # Responsibility
//! - Define the canonical task record and the persisted document envelope.
//! - Provide the arena-backed task forest used by all mutation paths.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId` unique within its forest.
//! - Persisted documents always carry an explicit `schema_version`.

pub mod forest;
pub mod task;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current instant as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}
