//! Data models for Trainlog

mod entry;
mod payload;
mod period;
mod status;
mod window;

pub use entry::{DraftId, Entry, EntryId, PersistedId, UserId};
pub use payload::{CommitPayload, EntryUpdate, NewEntry};
pub use period::{Hours, Period};
pub use status::EntryStatus;
pub use window::DateWindow;
