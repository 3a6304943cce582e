//! Client-local change status

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where an entry (or a whole day) stands relative to the baseline.
///
/// Never persisted; recomputed from the working set on every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Created locally, not yet on the server
    Added,
    /// Persisted entry with local edits
    Updated,
    /// Persisted entry marked for removal
    Deleted,
    /// Matches the baseline
    #[default]
    Unchanged,
}

impl EntryStatus {
    /// Lowercase label used in listings
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Unchanged => "unchanged",
        }
    }

    /// One-character marker for compact calendar output
    pub const fn marker(self) -> char {
        match self {
            Self::Added => '+',
            Self::Updated => '~',
            Self::Deleted => '-',
            Self::Unchanged => ' ',
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
