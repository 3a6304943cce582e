//! Training entry repository implementation

use chrono::NaiveDate;
use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::{
    CommitPayload, DateWindow, Entry, EntryUpdate, NewEntry, Period, PersistedId, UserId,
};
use crate::util::unix_timestamp_millis;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Trait for training entry storage operations (async)
#[allow(async_fn_in_trait)]
pub trait EntryRepository {
    /// List a user's live entries dated inside `window`, oldest first
    async fn list_window(&self, user_id: &UserId, window: DateWindow) -> Result<Vec<Entry>>;

    /// Insert a new entry and return it with its assigned id
    async fn insert(&self, entry: &NewEntry) -> Result<Entry>;

    /// Overwrite date and period of a live entry owned by `update.user_id`
    async fn update(&self, update: &EntryUpdate) -> Result<()>;

    /// Soft delete a live entry owned by `user_id`
    async fn delete(&self, user_id: &UserId, id: &PersistedId) -> Result<()>;

    /// Apply all three change groups in one transaction
    async fn apply_commit(
        &self,
        user_id: &UserId,
        window: DateWindow,
        payload: &CommitPayload,
    ) -> Result<Vec<Entry>>;
}

/// libSQL implementation of `EntryRepository`
pub struct LibSqlEntryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlEntryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an entry from a database row
    fn parse_entry(row: &libsql::Row) -> Result<Entry> {
        let id: String = row.get(0)?;
        let user_id: String = row.get(1)?;
        let date: String = row.get(2)?;
        let halves: i64 = row.get(3)?;

        let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .map_err(|e| Error::Database(format!("entry {id} has invalid date {date}: {e}")))?;
        let period = u8::try_from(halves)
            .ok()
            .and_then(Period::from_halves)
            .ok_or_else(|| {
                Error::Database(format!("entry {id} has invalid period of {halves} half-hours"))
            })?;

        Ok(Entry::persisted(
            PersistedId::new(id),
            UserId::new(user_id)?,
            date,
            period,
            row.get(4)?,
            row.get(5)?,
        ))
    }
}

impl EntryRepository for LibSqlEntryRepository<'_> {
    async fn list_window(&self, user_id: &UserId, window: DateWindow) -> Result<Vec<Entry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, date, period_halves, created_at, updated_at
                 FROM training_entries
                 WHERE user_id = ? AND is_deleted = 0 AND date >= ? AND date <= ?
                 ORDER BY date ASC, created_at ASC, id ASC",
                libsql::params![
                    user_id.as_str(),
                    window.start.format(DATE_FORMAT).to_string(),
                    window.end.format(DATE_FORMAT).to_string()
                ],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }

    async fn insert(&self, entry: &NewEntry) -> Result<Entry> {
        let now = unix_timestamp_millis();
        let stored = Entry::persisted(
            PersistedId::generate(),
            entry.user_id.clone(),
            entry.date,
            entry.period,
            now,
            now,
        );

        self.conn
            .execute(
                "INSERT INTO training_entries
                 (id, user_id, date, period_halves, created_at, updated_at, is_deleted)
                 VALUES (?, ?, ?, ?, ?, ?, 0)",
                libsql::params![
                    stored.id.to_string(),
                    stored.user_id.as_str(),
                    stored.date.format(DATE_FORMAT).to_string(),
                    i64::from(stored.period.halves()),
                    stored.created_at,
                    stored.updated_at
                ],
            )
            .await?;

        Ok(stored)
    }

    async fn update(&self, update: &EntryUpdate) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE training_entries
                 SET date = ?, period_halves = ?, updated_at = ?
                 WHERE id = ? AND user_id = ? AND is_deleted = 0",
                libsql::params![
                    update.date.format(DATE_FORMAT).to_string(),
                    i64::from(update.period.halves()),
                    unix_timestamp_millis(),
                    update.id.as_str(),
                    update.user_id.as_str()
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(update.id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, user_id: &UserId, id: &PersistedId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE training_entries SET is_deleted = 1, updated_at = ?
                 WHERE id = ? AND user_id = ? AND is_deleted = 0",
                libsql::params![unix_timestamp_millis(), id.as_str(), user_id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn apply_commit(
        &self,
        user_id: &UserId,
        window: DateWindow,
        payload: &CommitPayload,
    ) -> Result<Vec<Entry>> {
        if payload
            .updated
            .iter()
            .map(|update| &update.user_id)
            .chain(payload.added.iter().map(|new| &new.user_id))
            .any(|owner| owner != user_id)
        {
            return Err(Error::InvalidInput(format!(
                "commit for {user_id} contains entries of another user"
            )));
        }

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let applied: Result<()> = async {
            for id in &payload.deleted {
                self.delete(user_id, id).await?;
            }
            for update in &payload.updated {
                self.update(update).await?;
            }
            for new in &payload.added {
                self.insert(new).await?;
            }
            Ok(())
        }
        .await;

        if let Err(e) = applied {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        tracing::debug!(
            "Committed {} added, {} updated, {} deleted for {}",
            payload.added.len(),
            payload.updated.len(),
            payload.deleted.len(),
            user_id
        );
        self.list_window(user_id, window).await
    }
}
