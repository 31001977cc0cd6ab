//! Share and subscription use-case service.
//!
//! # Responsibility
//! - Decide create-vs-reuse when a personal date is shared.
//! - Enforce subscription hygiene: existence checks on add, pruning on load,
//!   pending-marker absorption.
//!
//! # Invariants
//! - A date's owned share id is reused while its list still exists; a stale
//!   entry is replaced by a fresh list.
//! - Subscribing to a non-existent list is silently refused.

use crate::model::now_epoch_ms;
use crate::model::task::{ListType, ShareId, Task};
use crate::repo::index_repo::{IndexRepository, SubscriptionEntry};
use crate::repo::list_repo::{ListRepository, ListWrite, NewList};
use crate::repo::{RepoError, RepoResult};
use log::info;

/// Result of sharing a personal date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareOutcome {
    /// Share id now owning the date's forest.
    pub list_id: ShareId,
    /// True when a fresh list was created rather than reused.
    pub created: bool,
}

/// Share/subscription orchestration over the list and index repositories.
pub struct ShareService<L: ListRepository, I: IndexRepository> {
    lists: L,
    index: I,
}

impl<L: ListRepository, I: IndexRepository> ShareService<L, I> {
    pub fn new(lists: L, index: I) -> Self {
        Self { lists, index }
    }

    /// Publishes the forest of one personal date under a share id.
    ///
    /// The first successful share of a date creates the list and remembers
    /// the id; later shares reuse it with a full-document write. An owned id
    /// whose list has been deleted is replaced by a fresh list.
    pub fn share_date(
        &self,
        client_id: &str,
        date: &str,
        tasks: &[Task],
        title: Option<&str>,
        list_type: ListType,
    ) -> RepoResult<ShareOutcome> {
        if let Some(existing) = self.index.owned_list_for_date(client_id, date)? {
            if self.lists.list_exists(&existing)? {
                self.lists.put_list(
                    &existing,
                    &ListWrite {
                        tasks: tasks.to_vec(),
                        title: title.map(str::to_string),
                        list_type: Some(list_type),
                        ..ListWrite::default()
                    },
                )?;
                return Ok(ShareOutcome {
                    list_id: existing,
                    created: false,
                });
            }
        }

        let list_id = self.lists.create_list(&NewList {
            tasks: tasks.to_vec(),
            title: title.map(str::to_string),
            list_type,
        })?;
        self.index.replace_owned_list(client_id, date, &list_id)?;
        info!("event=share_date module=service status=ok client={client_id} date={date} list={list_id}");
        Ok(ShareOutcome {
            list_id,
            created: true,
        })
    }

    /// Follows a shared list owned by someone else.
    ///
    /// Returns `false` without recording anything when the target list no
    /// longer exists.
    pub fn subscribe(
        &self,
        client_id: &str,
        list_id: &str,
        title: Option<&str>,
        url: &str,
    ) -> RepoResult<bool> {
        if !self.lists.list_exists(list_id)? {
            info!(
                "event=subscribe module=service status=refused client={client_id} list={list_id}"
            );
            return Ok(false);
        }
        self.index.upsert_subscription(
            client_id,
            &SubscriptionEntry {
                list_id: list_id.to_string(),
                title: title.map(str::to_string),
                url: url.to_string(),
                last_accessed_at: now_epoch_ms(),
            },
        )?;
        Ok(true)
    }

    /// Loads the subscription set, pruning entries whose list is gone.
    ///
    /// The pruned set is persisted back before returning.
    pub fn load_subscriptions(&self, client_id: &str) -> RepoResult<Vec<SubscriptionEntry>> {
        let mut kept = Vec::new();
        for entry in self.index.subscriptions(client_id)? {
            if self.lists.list_exists(&entry.list_id)? {
                kept.push(entry);
            } else {
                self.index.remove_subscription(client_id, &entry.list_id)?;
                info!(
                    "event=subscription_pruned module=service status=ok client={client_id} list={}",
                    entry.list_id
                );
            }
        }
        Ok(kept)
    }

    /// Converts pending markers left by root navigation into subscriptions.
    ///
    /// Returns the number of markers that became subscriptions; markers for
    /// deleted lists are dropped.
    pub fn absorb_pending_subscriptions(&self, client_id: &str) -> RepoResult<usize> {
        let mut absorbed = 0;
        for pending in self.index.take_pending_subscriptions(client_id)? {
            if self.subscribe(
                client_id,
                &pending.list_id,
                pending.title.as_deref(),
                &pending.url,
            )? {
                absorbed += 1;
            }
        }
        Ok(absorbed)
    }

    /// Deletes one shared list and purges it from every subscription set.
    pub fn delete_list(&self, list_id: &str) -> Result<(), RepoError> {
        self.lists.delete_list(list_id)?;
        info!("event=list_deleted module=service status=ok list={list_id}");
        Ok(())
    }
}
