//! Per-client session context.
//!
//! # Responsibility
//! - Hold everything one client interaction needs: the storage connection,
//!   the client identity, the focus navigator and the sync engine.
//! - Offer the use-case entry points the views call.
//!
//! # Invariants
//! - All state is owned by the session; nothing session-scoped lives in
//!   process globals. Two sessions never share mutable state.
//! - Pending subscription markers are absorbed on the next personal load.

use crate::db::{open_db, DbError};
use crate::focus::{FocusNavigator, RootJump, ViewContext};
use crate::model::task::{ListType, ShareId, SharedList, Task};
use crate::repo::index_repo::{IndexRepository, SqliteIndexRepository, SubscriptionEntry};
use crate::repo::list_repo::{ListRepository, SqliteListRepository};
use crate::repo::personal_repo::{PersonalRepository, SqlitePersonalRepository};
use crate::repo::RepoError;
use crate::service::share_service::{ShareOutcome, ShareService};
use crate::sync::topic::ListEvent;
use crate::sync::{SyncEngine, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_POLL_INTERVAL};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Duration;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug)]
pub enum SessionError {
    Db(DbError),
    Repo(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<DbError> for SessionError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Canonical relative URL of a shared list.
pub fn share_url(list_id: &str) -> String {
    format!("/list/{list_id}")
}

/// Settings of one client session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path of the SQLite store backing every view.
    pub db_path: PathBuf,
    /// Stable identity of this client.
    pub client_id: String,
    /// Cadence of the poll-and-diff fallback transport.
    pub poll_interval: Duration,
    /// Keep-alive cadence of change streams.
    pub heartbeat_interval: Duration,
}

impl SessionConfig {
    /// Creates a config with default transport cadences.
    pub fn new(db_path: impl Into<PathBuf>, client_id: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            client_id: client_id.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// One client's interaction context.
///
/// Owns the storage connection and the live transports; dropping the
/// session stops every poller and topic it started.
pub struct ClientSession {
    config: SessionConfig,
    conn: Connection,
    navigator: FocusNavigator,
    sync: SyncEngine,
}

impl ClientSession {
    /// Opens the store and starts a session on the personal view of `date`.
    pub fn open(config: SessionConfig, date: &str) -> SessionResult<Self> {
        let conn = open_db(&config.db_path)?;
        let sync = SyncEngine::new(
            config.db_path.clone(),
            config.poll_interval,
            config.heartbeat_interval,
        );
        let navigator = FocusNavigator::new(ViewContext::Personal {
            date: date.to_string(),
        });
        info!(
            "event=session_open module=session status=ok client={} date={date}",
            config.client_id
        );
        Ok(Self {
            config,
            conn,
            navigator,
            sync,
        })
    }

    /// Stable identity of this client.
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    /// Storage connection of this session.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Focus navigator of this session.
    pub fn navigator(&self) -> &FocusNavigator {
        &self.navigator
    }

    /// Mutable focus navigator of this session.
    pub fn navigator_mut(&mut self) -> &mut FocusNavigator {
        &mut self.navigator
    }

    /// Loads the personal view of one date and switches the navigator to it.
    ///
    /// Pending subscription markers left by earlier root navigation are
    /// absorbed into the subscription set first.
    pub fn load_personal_view(&mut self, date: &str) -> SessionResult<Vec<Task>> {
        let absorbed = self
            .share_service()
            .absorb_pending_subscriptions(&self.config.client_id)?;
        if absorbed > 0 {
            info!(
                "event=pending_absorbed module=session status=ok client={} count={absorbed}",
                self.config.client_id
            );
        }

        let tasks =
            SqlitePersonalRepository::new(&self.conn).load(&self.config.client_id, date)?;
        self.navigator.set_context(ViewContext::Personal {
            date: date.to_string(),
        });
        Ok(tasks)
    }

    /// Saves the personal view of one date, mirroring to its owned list.
    pub fn save_personal_view(&self, date: &str, tasks: &[Task]) -> SessionResult<()> {
        self.sync
            .save_personal(&self.conn, &self.config.client_id, date, tasks)?;
        Ok(())
    }

    /// Publishes the forest of one personal date under a share id.
    pub fn share_date(
        &self,
        date: &str,
        tasks: &[Task],
        title: Option<&str>,
        list_type: ListType,
    ) -> SessionResult<ShareOutcome> {
        let outcome =
            self.share_service()
                .share_date(&self.config.client_id, date, tasks, title, list_type)?;
        Ok(outcome)
    }

    /// Follows a shared list owned by someone else.
    pub fn subscribe(&self, list_id: &str, title: Option<&str>) -> SessionResult<bool> {
        let added = self.share_service().subscribe(
            &self.config.client_id,
            list_id,
            title,
            &share_url(list_id),
        )?;
        Ok(added)
    }

    /// Loads the subscription set, pruning entries whose list is gone.
    pub fn subscriptions(&self) -> SessionResult<Vec<SubscriptionEntry>> {
        let entries = self
            .share_service()
            .load_subscriptions(&self.config.client_id)?;
        Ok(entries)
    }

    /// Loads one shared list and switches the navigator to it.
    ///
    /// Returns `None` without touching the navigator when the list no longer
    /// exists. A list this client owns opens as an owned view, so leaving it
    /// never queues a self-subscription. An existing subscription entry has
    /// its access time refreshed.
    pub fn open_shared_list(&mut self, list_id: &str) -> SessionResult<Option<SharedList>> {
        let list = match SqliteListRepository::new(&self.conn).get_list(list_id)? {
            Some(list) => list,
            None => return Ok(None),
        };

        let index = SqliteIndexRepository::new(&self.conn);
        let owned_date = index
            .owned_lists(&self.config.client_id)?
            .into_iter()
            .find(|(_, owned_id)| owned_id == list_id)
            .map(|(date, _)| date);
        if let Some(date) = owned_date {
            self.navigator.set_context(ViewContext::OwnedList {
                list_id: list.list_id.clone(),
                date,
            });
            return Ok(Some(list));
        }

        let subscribed = index
            .subscriptions(&self.config.client_id)?
            .into_iter()
            .find(|entry| entry.list_id == list_id);
        if let Some(mut entry) = subscribed {
            entry.last_accessed_at = crate::model::now_epoch_ms();
            index.upsert_subscription(&self.config.client_id, &entry)?;
        }

        self.navigator.set_context(ViewContext::VisitedList {
            list_id: list.list_id.clone(),
            title: list.title.clone(),
            url: share_url(list_id),
        });
        Ok(Some(list))
    }

    /// Jumps to the root view and lands on the personal view of `date`.
    ///
    /// Leaving a visited shared list records a pending subscription marker so
    /// the list joins the subscription set on the next personal load.
    pub fn jump_to_root(&mut self, date: &str) -> SessionResult<()> {
        if let RootJump::LeftSharedView(pending) = self.navigator.jump_to_root() {
            SqliteIndexRepository::new(&self.conn)
                .add_pending_subscription(&self.config.client_id, &pending)?;
            info!(
                "event=pending_recorded module=session status=ok client={} list={}",
                self.config.client_id, pending.list_id
            );
        }
        self.navigator.set_context(ViewContext::Personal {
            date: date.to_string(),
        });
        Ok(())
    }

    /// Deletes one owned shared list.
    pub fn delete_list(&self, list_id: &str) -> SessionResult<()> {
        self.share_service().delete_list(list_id)?;
        Ok(())
    }

    /// Starts the pull loop for the owned list of `date`, if one exists.
    ///
    /// Remote changes are written back into the personal store and delivered
    /// on the returned channel.
    pub fn watch_owned_list(&mut self, date: &str) -> SessionResult<Option<Receiver<SharedList>>> {
        let owned = SqliteIndexRepository::new(&self.conn)
            .owned_list_for_date(&self.config.client_id, date)?;
        let list_id = match owned {
            Some(list_id) => list_id,
            None => return Ok(None),
        };
        let rx = self.sync.watch_owned(&self.config.client_id, date, &list_id);
        Ok(Some(rx))
    }

    /// Subscribes to the change stream of one list.
    pub fn watch_list(&mut self, list_id: &ShareId) -> Receiver<ListEvent> {
        self.sync.watch_list(list_id)
    }

    /// Stops every live transport started by this session.
    pub fn stop_sync(&mut self) {
        self.sync.stop_all();
    }

    fn share_service(
        &self,
    ) -> ShareService<SqliteListRepository<'_>, SqliteIndexRepository<'_>> {
        ShareService::new(
            SqliteListRepository::new(&self.conn),
            SqliteIndexRepository::new(&self.conn),
        )
    }
}
