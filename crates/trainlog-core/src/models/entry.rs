//! Training entry model

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntryStatus, Period};
use crate::error::{Error, Result};
use crate::util::{normalize_text_option, unix_timestamp_millis};

/// A locally generated identifier, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(Uuid);

impl DraftId {
    /// Create a new unique draft ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DraftId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An opaque identifier assigned by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedId(String);

impl PersistedId {
    /// Wrap a server-assigned identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh server-side identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersistedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of an entry: either a local draft or a persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum EntryId {
    /// Not yet persisted
    Draft(DraftId),
    /// Known to the server
    Persisted(PersistedId),
}

impl EntryId {
    /// Whether this id was generated locally
    pub const fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }

    /// The server id, if any
    pub const fn as_persisted(&self) -> Option<&PersistedId> {
        match self {
            Self::Persisted(id) => Some(id),
            Self::Draft(_) => None,
        }
    }
}

impl From<DraftId> for EntryId {
    fn from(id: DraftId) -> Self {
        Self::Draft(id)
    }
}

impl From<PersistedId> for EntryId {
    fn from(id: PersistedId) -> Self {
        Self::Persisted(id)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft(id) => write!(f, "draft:{id}"),
            Self::Persisted(id) => write!(f, "{id}"),
        }
    }
}

/// Owner of a training log
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id; surrounding whitespace is trimmed and empty ids are rejected
    pub fn new(id: impl Into<String>) -> Result<Self> {
        normalize_text_option(Some(id.into()))
            .map(Self)
            .ok_or_else(|| Error::InvalidInput("user id cannot be empty".into()))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// One logged training session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Draft or persisted identifier
    pub id: EntryId,
    /// Owner
    pub user_id: UserId,
    /// Day the session took place
    pub date: NaiveDate,
    /// Duration
    pub period: Period,
    /// Creation timestamp (Unix ms); provisional for drafts
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Client-local change status
    #[serde(default)]
    pub status: EntryStatus,
    /// Marked for removal
    #[serde(default)]
    pub is_deleted: bool,
    /// Period before the first edit in this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_period: Option<Period>,
    /// Deletion order within the session; newer deletions compare greater
    #[serde(skip)]
    pub deleted_seq: Option<u64>,
}

impl Entry {
    /// An entry as returned by the server
    pub const fn persisted(
        id: PersistedId,
        user_id: UserId,
        date: NaiveDate,
        period: Period,
        created_at: i64,
        updated_at: i64,
    ) -> Self {
        Self {
            id: EntryId::Persisted(id),
            user_id,
            date,
            period,
            created_at,
            updated_at,
            status: EntryStatus::Unchanged,
            is_deleted: false,
            original_period: None,
            deleted_seq: None,
        }
    }

    /// A new local entry with provisional timestamps
    #[must_use]
    pub fn draft(user_id: UserId, date: NaiveDate, period: Period) -> Self {
        let now = unix_timestamp_millis();
        Self {
            id: EntryId::Draft(DraftId::new()),
            user_id,
            date,
            period,
            created_at: now,
            updated_at: now,
            status: EntryStatus::Added,
            is_deleted: false,
            original_period: None,
            deleted_seq: None,
        }
    }

    /// Whether this entry only exists locally
    pub const fn is_draft(&self) -> bool {
        self.id.is_draft()
    }

    /// The server id, if any
    pub const fn persisted_id(&self) -> Option<&PersistedId> {
        self.id.as_persisted()
    }

    /// Compare the fields a commit can change
    pub fn same_values(&self, other: &Self) -> bool {
        self.date == other.date && self.period == other.period && self.user_id == other.user_id
    }

    /// Copy of this entry with the given display status
    #[must_use]
    pub fn with_status(&self, status: EntryStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Strip client-local annotations, as a freshly fetched entry would be
    #[must_use]
    pub fn into_clean(self) -> Self {
        Self {
            status: EntryStatus::Unchanged,
            is_deleted: false,
            original_period: None,
            deleted_seq: None,
            ..self
        }
    }
}
