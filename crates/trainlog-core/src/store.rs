//! Storage collaborator interface
//!
//! The engine never talks to a database directly. It fetches a baseline and
//! hands a commit payload to an [`EntryStore`]. Implementations must apply a
//! commit atomically, or report [`Error::PartialCommit`] when they could not.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{CommitPayload, DateWindow, Entry, EntryId, PersistedId, UserId};
use crate::util::unix_timestamp_millis;

/// Baseline fetch and batch write for one user's training log (async)
#[allow(async_fn_in_trait)]
pub trait EntryStore {
    /// Persisted entries of `user_id` dated inside `window`, ordered by date
    async fn fetch_baseline(&self, user_id: &UserId, window: DateWindow) -> Result<Vec<Entry>>;

    /// Apply a change-set and return the resulting entries for `window`
    async fn commit(
        &self,
        user_id: &UserId,
        window: DateWindow,
        payload: &CommitPayload,
    ) -> Result<Vec<Entry>>;
}

impl<T: EntryStore + ?Sized> EntryStore for &T {
    async fn fetch_baseline(&self, user_id: &UserId, window: DateWindow) -> Result<Vec<Entry>> {
        (**self).fetch_baseline(user_id, window).await
    }

    async fn commit(
        &self,
        user_id: &UserId,
        window: DateWindow,
        payload: &CommitPayload,
    ) -> Result<Vec<Entry>> {
        (**self).commit(user_id, window, payload).await
    }
}

impl<T: EntryStore + ?Sized> EntryStore for Arc<T> {
    async fn fetch_baseline(&self, user_id: &UserId, window: DateWindow) -> Result<Vec<Entry>> {
        (**self).fetch_baseline(user_id, window).await
    }

    async fn commit(
        &self,
        user_id: &UserId,
        window: DateWindow,
        payload: &CommitPayload,
    ) -> Result<Vec<Entry>> {
        (**self).commit(user_id, window, payload).await
    }
}

/// Failure to inject into the next [`MemoryEntryStore`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    /// The next fetch fails
    Fetch,
    /// The next commit fails before applying anything
    Commit,
    /// The next commit applies its deletions and then fails
    PartialCommit,
}

/// In-memory [`EntryStore`] for tests and offline demos.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    rows: Mutex<Vec<Entry>>,
    failure: Mutex<Option<StoreFailure>>,
}

impl MemoryEntryStore {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            rows: Mutex::new(entries.into_iter().map(Entry::into_clean).collect()),
            failure: Mutex::new(None),
        }
    }

    /// Make the next matching call fail
    pub async fn fail_next(&self, failure: StoreFailure) {
        *self.failure.lock().await = Some(failure);
    }

    /// All stored rows
    pub async fn entries(&self) -> Vec<Entry> {
        self.rows.lock().await.clone()
    }

    async fn take_failure(&self, matches: impl Fn(StoreFailure) -> bool) -> Option<StoreFailure> {
        let mut failure = self.failure.lock().await;
        match *failure {
            Some(kind) if matches(kind) => failure.take(),
            _ => None,
        }
    }

    fn window_of(rows: &[Entry], user_id: &UserId, window: DateWindow) -> Vec<Entry> {
        let mut entries: Vec<Entry> = rows
            .iter()
            .filter(|entry| &entry.user_id == user_id && window.contains(entry.date))
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
        });
        entries
    }

    fn position(rows: &[Entry], user_id: &UserId, id: &PersistedId) -> Result<usize> {
        rows.iter()
            .position(|entry| {
                &entry.user_id == user_id && entry.id == EntryId::Persisted(id.clone())
            })
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}

impl EntryStore for MemoryEntryStore {
    async fn fetch_baseline(&self, user_id: &UserId, window: DateWindow) -> Result<Vec<Entry>> {
        if self
            .take_failure(|kind| kind == StoreFailure::Fetch)
            .await
            .is_some()
        {
            return Err(Error::Database("simulated fetch failure".into()));
        }
        let rows = self.rows.lock().await;
        Ok(Self::window_of(&rows, user_id, window))
    }

    async fn commit(
        &self,
        user_id: &UserId,
        window: DateWindow,
        payload: &CommitPayload,
    ) -> Result<Vec<Entry>> {
        let failure = self
            .take_failure(|kind| kind != StoreFailure::Fetch)
            .await;
        if failure == Some(StoreFailure::Commit) {
            return Err(Error::Database("simulated commit failure".into()));
        }

        let mut rows = self.rows.lock().await;
        for update in &payload.updated {
            Self::position(&rows, user_id, &update.id)?;
        }
        for id in &payload.deleted {
            Self::position(&rows, user_id, id)?;
        }

        let now = unix_timestamp_millis();
        for id in &payload.deleted {
            let index = Self::position(&rows, user_id, id)?;
            rows.remove(index);
        }
        if failure == Some(StoreFailure::PartialCommit) {
            return Err(Error::PartialCommit(
                "deletions applied, additions and updates failed".into(),
            ));
        }

        for update in &payload.updated {
            let index = Self::position(&rows, user_id, &update.id)?;
            let row = &mut rows[index];
            row.date = update.date;
            row.period = update.period;
            row.updated_at = now;
        }
        for new in &payload.added {
            rows.push(Entry::persisted(
                PersistedId::generate(),
                new.user_id.clone(),
                new.date,
                new.period,
                now,
                now,
            ));
        }

        Ok(Self::window_of(&rows, user_id, window))
    }
}
