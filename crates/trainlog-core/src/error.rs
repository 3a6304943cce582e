//! Error types for trainlog-core

use thiserror::Error;

/// Result type alias using trainlog-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trainlog-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entry not found
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Period outside [0.5, 5] or not a multiple of 0.5
    #[error("Invalid period: {0} (expected a multiple of 0.5 between 0.5 and 5)")]
    InvalidPeriod(f64),

    /// Entry is marked deleted and cannot be edited
    #[error("Entry is marked deleted: {0}")]
    EntryDeleted(String),

    /// A day editor was opened before the working set last changed
    #[error("Day editor for {0} is out of date; reopen it")]
    StaleEditor(String),

    /// A commit is in flight
    #[error("A commit is already in progress")]
    Busy,

    /// Baseline fetch failed
    #[error("Failed to load training log: {0}")]
    Load(String),

    /// Commit failed; local edits are kept
    #[error("Failed to save training log: {0}")]
    Commit(String),

    /// Some change groups were applied and others were not
    #[error("Training log was only partially saved: {0}")]
    PartialCommit(String),

    /// Local state no longer matches the server and must be reloaded
    #[error("Training log must be reloaded before further edits")]
    ReloadRequired,
}
