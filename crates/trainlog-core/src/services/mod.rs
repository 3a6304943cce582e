//! Shared services used by front-ends.

mod entry_store;

pub use entry_store::EntryStoreService;
