//! Per-list fan-out change stream.
//!
//! # Responsibility
//! - Watch one shared list's storage for marker changes and publish the
//!   full forest snapshot to every subscriber.
//! - Emit periodic heartbeats so idle consumers can detect a live stream.
//!
//! # Invariants
//! - One watcher thread per topic, regardless of subscriber count.
//! - Subscribers whose receiver is gone are dropped from the fan-out.
//! - The payload shape matches the poll transport: the full list document.

use crate::db::open_db;
use crate::model::task::{ShareId, SharedList};
use crate::repo::list_repo::SqliteListRepository;
use crate::sync::poller::{poll_once, sleep_with_stop, PollState};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// One event on a list change stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    /// The list content changed; carries the full refreshed document.
    Snapshot(SharedList),
    /// Keep-alive marker emitted on a fixed interval.
    Heartbeat,
}

type SubscriberSet = Arc<Mutex<Vec<Sender<ListEvent>>>>;

/// Fan-out topic for one shared list.
pub struct ListTopic {
    list_id: ShareId,
    subscribers: SubscriberSet,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ListTopic {
    /// Spawns the watcher thread for one list id.
    pub fn spawn(
        db_path: PathBuf,
        list_id: ShareId,
        check_interval: Duration,
        heartbeat_interval: Duration,
    ) -> Self {
        let subscribers: SubscriberSet = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let thread_subscribers = Arc::clone(&subscribers);
        let stop_flag = Arc::clone(&stop);
        let thread_list_id = list_id.clone();

        let handle = std::thread::spawn(move || {
            let conn = match open_db(&db_path) {
                Ok(conn) => conn,
                Err(err) => {
                    error!(
                        "event=topic_start module=sync status=error list={thread_list_id} error={err}"
                    );
                    return;
                }
            };
            let repo = SqliteListRepository::new(&conn);
            let mut state = PollState::default();
            let mut last_heartbeat = Instant::now();

            while !stop_flag.load(Ordering::Relaxed) {
                match poll_once(&repo, &thread_list_id, &mut state) {
                    Ok(Some(list)) => {
                        info!(
                            "event=topic_publish module=sync status=ok list={thread_list_id} last_modified={}",
                            list.last_modified
                        );
                        publish(&thread_subscribers, ListEvent::Snapshot(list));
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(
                            "event=topic_tick module=sync status=error list={thread_list_id} error={err}"
                        );
                    }
                }

                if last_heartbeat.elapsed() >= heartbeat_interval {
                    publish(&thread_subscribers, ListEvent::Heartbeat);
                    last_heartbeat = Instant::now();
                }
                sleep_with_stop(&stop_flag, check_interval);
            }
        });

        Self {
            list_id,
            subscribers,
            stop,
            handle: Some(handle),
        }
    }

    /// Id of the watched list.
    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    /// Registers one subscriber and returns its event receiver.
    pub fn subscribe(&self) -> Receiver<ListEvent> {
        let (tx, rx) = channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Number of currently registered subscribers.
    ///
    /// Dead subscribers are only collected when an event is published, so
    /// this can briefly over-count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|set| set.len()).unwrap_or(0)
    }

    /// Stops the watcher and waits for the thread to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ListTopic {
    fn drop(&mut self) {
        self.stop();
    }
}

fn publish(subscribers: &SubscriberSet, event: ListEvent) {
    if let Ok(mut set) = subscribers.lock() {
        set.retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
