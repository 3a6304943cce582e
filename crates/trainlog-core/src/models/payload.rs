//! Commit payload sent to the batch-write collaborator

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Entry, Period, PersistedId, UserId};

/// An entry to insert; the server assigns its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub period: Period,
}

/// New values for a persisted entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryUpdate {
    pub id: PersistedId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub period: Period,
}

/// The three independent change groups of one commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPayload {
    pub added: Vec<NewEntry>,
    pub updated: Vec<EntryUpdate>,
    pub deleted: Vec<PersistedId>,
}

impl CommitPayload {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

impl From<&Entry> for NewEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            user_id: entry.user_id.clone(),
            date: entry.date,
            period: entry.period,
        }
    }
}
