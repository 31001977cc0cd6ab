//! Poll-and-diff fallback transport.
//!
//! # Responsibility
//! - Watch one shared list's `last_modified` marker on a fixed cadence.
//! - Deliver the freshly fetched forest whenever the marker moves.
//!
//! # Invariants
//! - The first observation in a session is a baseline, stored but never
//!   diffed against.
//! - Failures are logged and the loop continues on schedule; nothing is
//!   retried or backed off.
//! - Stopping discards the baseline, so a restarted poller re-baselines.

use crate::db::open_db;
use crate::model::task::{ShareId, SharedList};
use crate::repo::list_repo::{ListRepository, SqliteListRepository};
use crate::repo::RepoResult;
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const STOP_CHECK_STEP: Duration = Duration::from_millis(25);

/// Diff state of one polling session.
#[derive(Debug, Default)]
pub struct PollState {
    baseline: Option<i64>,
}

impl PollState {
    /// Returns the stored baseline marker.
    pub fn baseline(&self) -> Option<i64> {
        self.baseline
    }
}

/// Performs one poll tick against the store.
///
/// Returns the full refreshed list only when a stored baseline mismatches
/// the current marker. A missing list keeps the baseline untouched.
pub fn poll_once<R: ListRepository>(
    repo: &R,
    list_id: &str,
    state: &mut PollState,
) -> RepoResult<Option<SharedList>> {
    let marker = match repo.last_modified(list_id)? {
        Some(marker) => marker,
        None => {
            warn!("event=poll_tick module=sync status=missing list={list_id}");
            return Ok(None);
        }
    };

    match state.baseline {
        None => {
            state.baseline = Some(marker);
            Ok(None)
        }
        Some(baseline) if baseline == marker => Ok(None),
        Some(_) => {
            let refreshed = repo.get_list(list_id)?;
            state.baseline = Some(marker);
            Ok(refreshed)
        }
    }
}

/// Background polling handle for one shared list.
pub struct ListPoller {
    list_id: ShareId,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ListPoller {
    /// Spawns the poll loop on its own thread and connection.
    ///
    /// `on_change` runs on the poller thread with the poller's connection,
    /// so writeback into other tables reuses the same handle.
    pub fn spawn<F>(db_path: PathBuf, list_id: ShareId, interval: Duration, mut on_change: F) -> Self
    where
        F: FnMut(&Connection, &SharedList) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread_list_id = list_id.clone();

        let handle = std::thread::spawn(move || {
            let conn = match open_db(&db_path) {
                Ok(conn) => conn,
                Err(err) => {
                    error!(
                        "event=poll_start module=sync status=error list={thread_list_id} error={err}"
                    );
                    return;
                }
            };
            let repo = SqliteListRepository::new(&conn);
            // Baseline lives on this stack; a restarted poller starts fresh.
            let mut state = PollState::default();

            while !stop_flag.load(Ordering::Relaxed) {
                match poll_once(&repo, &thread_list_id, &mut state) {
                    Ok(Some(list)) => {
                        info!(
                            "event=poll_change module=sync status=ok list={thread_list_id} last_modified={}",
                            list.last_modified
                        );
                        on_change(&conn, &list);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(
                            "event=poll_tick module=sync status=error list={thread_list_id} error={err}"
                        );
                    }
                }
                sleep_with_stop(&stop_flag, interval);
            }
        });

        Self {
            list_id,
            stop,
            handle: Some(handle),
        }
    }

    /// Id of the watched list.
    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    /// Stops the loop and waits for the thread to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ListPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

pub(crate) fn sleep_with_stop(stop: &AtomicBool, total: Duration) {
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
        let step = remaining.min(STOP_CHECK_STEP);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
