//! Multi-view synchronization engine.
//!
//! # Responsibility
//! - Mirror personal saves into the owned shared list for the same date
//!   (push-on-mutate) and write detected owned-list changes back into the
//!   personal store (pull writeback).
//! - Manage live transports: fan-out topics (primary) and poll loops
//!   (fallback).
//!
//! # Invariants
//! - The personal save and the mirror push are independent writes; a
//!   reader can observe them out of order.
//! - Mirror failures are logged and swallowed; a local edit is never
//!   rolled back because the remote write failed.
//! - Last-write-wins is the only conflict policy: every write is a
//!   full-document replace and the last completed write wins entirely.

pub mod poller;
pub mod topic;

use crate::model::task::{ShareId, SharedList, Task};
use crate::repo::index_repo::{IndexRepository, SqliteIndexRepository};
use crate::repo::list_repo::{ListRepository, ListWrite, SqliteListRepository};
use crate::repo::personal_repo::{PersonalRepository, SqlitePersonalRepository};
use crate::repo::RepoResult;
use crate::sync::poller::ListPoller;
use crate::sync::topic::{ListEvent, ListTopic};
use log::{info, warn};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// Default cadence of the poll-and-diff loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Default keep-alive cadence of a change stream.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// Owner of the live transports and the mirroring rules.
pub struct SyncEngine {
    db_path: PathBuf,
    poll_interval: Duration,
    heartbeat_interval: Duration,
    pollers: Vec<ListPoller>,
    topics: HashMap<ShareId, ListTopic>,
}

impl SyncEngine {
    /// Creates an engine over the store at `db_path`.
    pub fn new(db_path: PathBuf, poll_interval: Duration, heartbeat_interval: Duration) -> Self {
        Self {
            db_path,
            poll_interval,
            heartbeat_interval,
            pollers: Vec::new(),
            topics: HashMap::new(),
        }
    }

    /// Saves personal tasks for a date and mirrors them to the owned list.
    ///
    /// The personal save is authoritative and its failure propagates. The
    /// mirror push is best-effort: failures are logged, never retried, and
    /// never roll back the personal save.
    pub fn save_personal(
        &self,
        conn: &Connection,
        client_id: &str,
        date: &str,
        tasks: &[Task],
    ) -> RepoResult<()> {
        SqlitePersonalRepository::new(conn).save(client_id, date, tasks)?;
        mirror_to_owned(conn, client_id, date, tasks);
        Ok(())
    }

    /// Starts the owned-list pull loop for one date.
    ///
    /// A detected remote change is written back into the personal store for
    /// `date` and the refreshed list is delivered on the returned channel.
    pub fn watch_owned(
        &mut self,
        client_id: &str,
        date: &str,
        list_id: &str,
    ) -> Receiver<SharedList> {
        let (tx, rx) = std::sync::mpsc::channel();
        let client_id = client_id.to_string();
        let date = date.to_string();

        let poller = ListPoller::spawn(
            self.db_path.clone(),
            list_id.to_string(),
            self.poll_interval,
            move |conn, list| {
                let personal = SqlitePersonalRepository::new(conn);
                if let Err(err) = personal.save(&client_id, &date, &list.tasks) {
                    warn!(
                        "event=mirror_pull module=sync status=error client={client_id} date={date} error={err}"
                    );
                } else {
                    info!(
                        "event=mirror_pull module=sync status=ok client={client_id} date={date} list={}",
                        list.list_id
                    );
                }
                let _ = tx.send(list.clone());
            },
        );
        self.pollers.push(poller);
        rx
    }

    /// Subscribes to the fan-out change stream of one list, creating the
    /// topic watcher on first use.
    pub fn watch_list(&mut self, list_id: &str) -> Receiver<ListEvent> {
        let topic = self.topics.entry(list_id.to_string()).or_insert_with(|| {
            ListTopic::spawn(
                self.db_path.clone(),
                list_id.to_string(),
                self.poll_interval,
                self.heartbeat_interval,
            )
        });
        topic.subscribe()
    }

    /// Number of live poll loops.
    pub fn active_pollers(&self) -> usize {
        self.pollers.len()
    }

    /// Number of live fan-out topics.
    pub fn active_topics(&self) -> usize {
        self.topics.len()
    }

    /// Stops every live transport and discards their baselines.
    pub fn stop_all(&mut self) {
        for poller in &mut self.pollers {
            poller.stop();
        }
        self.pollers.clear();
        for topic in self.topics.values_mut() {
            topic.stop();
        }
        self.topics.clear();
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Pushes `tasks` to the owned list for `date`, if one exists.
///
/// Every failure path is logged and swallowed.
fn mirror_to_owned(conn: &Connection, client_id: &str, date: &str, tasks: &[Task]) {
    let index = SqliteIndexRepository::new(conn);
    let list_id = match index.owned_list_for_date(client_id, date) {
        Ok(Some(list_id)) => list_id,
        Ok(None) => return,
        Err(err) => {
            warn!(
                "event=mirror_push module=sync status=error client={client_id} date={date} error={err}"
            );
            return;
        }
    };

    let lists = SqliteListRepository::new(conn);
    match lists.put_list(
        &list_id,
        &ListWrite {
            tasks: tasks.to_vec(),
            ..ListWrite::default()
        },
    ) {
        Ok(stamped) => {
            info!(
                "event=mirror_push module=sync status=ok client={client_id} date={date} list={list_id} last_modified={stamped}"
            );
        }
        Err(err) => {
            warn!(
                "event=mirror_push module=sync status=error client={client_id} date={date} list={list_id} error={err}"
            );
        }
    }
}
