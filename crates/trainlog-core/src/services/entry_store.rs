//! libSQL-backed entry store shared across clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, EntryRepository, LibSqlEntryRepository};
use crate::models::{CommitPayload, DateWindow, Entry, UserId};
use crate::store::EntryStore;
use crate::Result;

/// Thread-safe [`EntryStore`] over a local libSQL database.
#[derive(Clone)]
pub struct EntryStoreService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl EntryStoreService {
    /// Open a store at the given filesystem path, creating parent directories.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening training log at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem location, if not in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl EntryStore for EntryStoreService {
    async fn fetch_baseline(&self, user_id: &UserId, window: DateWindow) -> Result<Vec<Entry>> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        repo.list_window(user_id, window).await
    }

    async fn commit(
        &self,
        user_id: &UserId,
        window: DateWindow,
        payload: &CommitPayload,
    ) -> Result<Vec<Entry>> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        repo.apply_commit(user_id, window, payload).await
    }
}
