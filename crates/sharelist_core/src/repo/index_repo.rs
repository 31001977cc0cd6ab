//! Ownership and subscription index repository.
//!
//! # Responsibility
//! - Persist the per-client date -> owned share id map.
//! - Persist the per-client subscription set with cached display metadata.
//! - Persist pending-subscription markers written by root navigation.
//!
//! # Invariants
//! - At most one owned list per (client, date); the first successful
//!   creation wins and is remembered for reuse.
//! - Subscription entries are deduplicated by list id.

use crate::model::task::ShareId;
use crate::repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension};

/// One followed shared list with cached display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEntry {
    pub list_id: ShareId,
    pub title: Option<String>,
    pub url: String,
    pub last_accessed_at: i64,
}

/// Marker recorded when the navigator leaves a visited shared list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubscription {
    pub list_id: ShareId,
    pub title: Option<String>,
    pub url: String,
}

/// Repository interface for ownership/subscription indices.
pub trait IndexRepository {
    /// Returns the owned share id for one date, if any.
    fn owned_list_for_date(&self, client_id: &str, date: &str) -> RepoResult<Option<ShareId>>;
    /// Remembers an owned list for a date; idempotent, first entry wins.
    fn add_owned_list(&self, client_id: &str, date: &str, list_id: &str) -> RepoResult<()>;
    /// Replaces the owned entry for a date regardless of prior content.
    fn replace_owned_list(&self, client_id: &str, date: &str, list_id: &str) -> RepoResult<()>;
    /// Lists all (date, share id) ownership pairs of one client.
    fn owned_lists(&self, client_id: &str) -> RepoResult<Vec<(String, ShareId)>>;

    /// Lists the subscription set of one client, most recently accessed
    /// first.
    fn subscriptions(&self, client_id: &str) -> RepoResult<Vec<SubscriptionEntry>>;
    /// Adds or refreshes one subscription entry.
    fn upsert_subscription(&self, client_id: &str, entry: &SubscriptionEntry) -> RepoResult<()>;
    /// Removes one subscription entry.
    fn remove_subscription(&self, client_id: &str, list_id: &str) -> RepoResult<()>;

    /// Records one pending-subscription marker.
    fn add_pending_subscription(
        &self,
        client_id: &str,
        pending: &PendingSubscription,
    ) -> RepoResult<()>;
    /// Returns and clears all pending markers of one client.
    fn take_pending_subscriptions(&self, client_id: &str) -> RepoResult<Vec<PendingSubscription>>;
}

/// SQLite-backed index repository.
pub struct SqliteIndexRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIndexRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl IndexRepository for SqliteIndexRepository<'_> {
    fn owned_list_for_date(&self, client_id: &str, date: &str) -> RepoResult<Option<ShareId>> {
        let value = self
            .conn
            .query_row(
                "SELECT list_id FROM owned_lists WHERE client_id = ?1 AND date = ?2;",
                [client_id, date],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn add_owned_list(&self, client_id: &str, date: &str, list_id: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO owned_lists (client_id, date, list_id)
             VALUES (?1, ?2, ?3);",
            [client_id, date, list_id],
        )?;
        Ok(())
    }

    fn replace_owned_list(&self, client_id: &str, date: &str, list_id: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO owned_lists (client_id, date, list_id)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (client_id, date) DO UPDATE SET list_id = excluded.list_id;",
            [client_id, date, list_id],
        )?;
        Ok(())
    }

    fn owned_lists(&self, client_id: &str) -> RepoResult<Vec<(String, ShareId)>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, list_id FROM owned_lists
             WHERE client_id = ?1
             ORDER BY date ASC;",
        )?;
        let mut rows = stmt.query([client_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push((row.get(0)?, row.get(1)?));
        }
        Ok(entries)
    }

    fn subscriptions(&self, client_id: &str) -> RepoResult<Vec<SubscriptionEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT list_id, title, url, last_accessed_at
             FROM subscriptions
             WHERE client_id = ?1
             ORDER BY last_accessed_at DESC, list_id ASC;",
        )?;
        let mut rows = stmt.query([client_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(SubscriptionEntry {
                list_id: row.get(0)?,
                title: row.get(1)?,
                url: row.get(2)?,
                last_accessed_at: row.get(3)?,
            });
        }
        Ok(entries)
    }

    fn upsert_subscription(&self, client_id: &str, entry: &SubscriptionEntry) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO subscriptions (client_id, list_id, title, url, last_accessed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (client_id, list_id)
             DO UPDATE SET title = excluded.title,
                           url = excluded.url,
                           last_accessed_at = excluded.last_accessed_at;",
            params![
                client_id,
                entry.list_id,
                entry.title.as_deref(),
                entry.url,
                entry.last_accessed_at,
            ],
        )?;
        Ok(())
    }

    fn remove_subscription(&self, client_id: &str, list_id: &str) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM subscriptions WHERE client_id = ?1 AND list_id = ?2;",
            [client_id, list_id],
        )?;
        Ok(())
    }

    fn add_pending_subscription(
        &self,
        client_id: &str,
        pending: &PendingSubscription,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO pending_subscriptions (client_id, list_id, title, url)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (client_id, list_id)
             DO UPDATE SET title = excluded.title, url = excluded.url;",
            params![
                client_id,
                pending.list_id,
                pending.title.as_deref(),
                pending.url,
            ],
        )?;
        Ok(())
    }

    fn take_pending_subscriptions(&self, client_id: &str) -> RepoResult<Vec<PendingSubscription>> {
        let mut stmt = self.conn.prepare(
            "SELECT list_id, title, url FROM pending_subscriptions
             WHERE client_id = ?1
             ORDER BY list_id ASC;",
        )?;
        let mut rows = stmt.query([client_id])?;
        let mut pending = Vec::new();
        while let Some(row) = rows.next()? {
            pending.push(PendingSubscription {
                list_id: row.get(0)?,
                title: row.get(1)?,
                url: row.get(2)?,
            });
        }

        self.conn.execute(
            "DELETE FROM pending_subscriptions WHERE client_id = ?1;",
            [client_id],
        )?;
        Ok(pending)
    }
}
