//! Database layer for Trainlog

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{EntryRepository, LibSqlEntryRepository};
