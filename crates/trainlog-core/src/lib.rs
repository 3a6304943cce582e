//! trainlog-core - Core library for Trainlog
//!
//! This crate contains the training entry model, the local edit engine
//! (working set, day editor, diff and month presentation), and the libSQL
//! storage layer used by every Trainlog front-end.

pub mod config;
pub mod db;
pub mod diff;
pub mod editor;
pub mod error;
pub mod models;
pub mod month;
pub mod services;
pub mod session;
pub mod state;
pub mod store;
pub mod util;
pub mod working_set;

pub use config::EditorConfig;
pub use diff::{diff, ChangeSet, DiffReport};
pub use editor::DayEditor;
pub use error::{Error, Result};
pub use models::{
    CommitPayload, DateWindow, DraftId, Entry, EntryId, EntryStatus, EntryUpdate, Hours,
    NewEntry, Period, PersistedId, UserId,
};
pub use month::{DayRow, DaySummary, MonthPresenter, MonthView};
pub use services::EntryStoreService;
pub use session::{CommitSummary, CommitTicket, EditorSession};
pub use state::SessionPhase;
pub use store::{EntryStore, MemoryEntryStore, StoreFailure};
pub use working_set::{Baseline, EditAction, WorkingSet};
