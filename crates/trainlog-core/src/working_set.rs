//! Baseline snapshot and the working set edited against it

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::EditorConfig;
use crate::editor::DayEditor;
use crate::error::{Error, Result};
use crate::models::{DateWindow, Entry, EntryId, Period, UserId};

/// Server-confirmed entries for one user and date window.
///
/// Kept unmodified while the user edits; only replaced by a successful
/// commit or an explicit reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Baseline {
    user_id: UserId,
    window: DateWindow,
    entries: Vec<Entry>,
}

impl Baseline {
    /// Validate a fetched snapshot.
    ///
    /// Every entry must be persisted, unique, owned by `user_id`, and dated
    /// inside `window`. Client-local annotations are stripped.
    pub fn new(user_id: UserId, window: DateWindow, entries: Vec<Entry>) -> Result<Self> {
        let mut clean = Vec::with_capacity(entries.len());
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in entries {
            if entry.is_draft() {
                return Err(Error::InvalidInput(format!(
                    "baseline contains unsaved entry {}",
                    entry.id
                )));
            }
            if entry.user_id != user_id {
                return Err(Error::InvalidInput(format!(
                    "baseline entry {} belongs to {}, expected {user_id}",
                    entry.id, entry.user_id
                )));
            }
            if !window.contains(entry.date) {
                return Err(Error::InvalidInput(format!(
                    "baseline entry {} dated {} is outside {window}",
                    entry.id, entry.date
                )));
            }
            if !seen.insert(entry.id.clone()) {
                return Err(Error::InvalidInput(format!(
                    "baseline contains entry {} more than once",
                    entry.id
                )));
            }
            clean.push(entry.into_clean());
        }

        Ok(Self {
            user_id,
            window,
            entries: clean,
        })
    }

    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub const fn window(&self) -> DateWindow {
        self.window
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// A single edit, applied as a pure transition over a [`WorkingSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    /// Add a session of the default period on `date`
    Add { date: NaiveDate },
    /// Change an entry's duration
    EditPeriod { id: EntryId, period: Period },
    /// Remove a draft, or mark a persisted entry deleted
    Delete { id: EntryId },
}

/// The user's current, possibly edited copy of the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkingSet {
    user_id: UserId,
    window: DateWindow,
    entries: Vec<Entry>,
    #[serde(skip)]
    next_seq: u64,
}

impl WorkingSet {
    /// Start editing from a baseline; every entry begins `unchanged`.
    pub fn from_baseline(baseline: &Baseline) -> Self {
        Self {
            user_id: baseline.user_id.clone(),
            window: baseline.window,
            entries: baseline.entries.clone(),
            next_seq: 0,
        }
    }

    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub const fn window(&self) -> DateWindow {
        self.window
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Look up an entry by id
    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Entries dated `date`, deleted ones included
    pub fn entries_on(&self, date: NaiveDate) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |entry| entry.date == date)
    }

    /// Open the per-day editor for `date`
    pub fn day_editor(&self, date: NaiveDate, config: &EditorConfig) -> Result<DayEditor> {
        if !self.window.contains(date) {
            return Err(Error::InvalidInput(format!(
                "{date} is outside the loaded range {}",
                self.window
            )));
        }
        Ok(DayEditor::new(
            self.user_id.clone(),
            date,
            config.default_period,
            self.entries_on(date).cloned().collect(),
            self.next_seq,
        ))
    }

    /// Apply one edit and return the resulting working set.
    pub fn apply(&self, action: &EditAction, config: &EditorConfig) -> Result<Self> {
        match action {
            EditAction::Add { date } => {
                let mut editor = self.day_editor(*date, config)?;
                editor.add_entry();
                Ok(editor.save(self))
            }
            EditAction::EditPeriod { id, period } => {
                let mut editor = self.day_editor(self.date_of(id)?, config)?;
                editor.edit_period(id, *period)?;
                Ok(editor.save(self))
            }
            EditAction::Delete { id } => {
                let mut editor = self.day_editor(self.date_of(id)?, config)?;
                editor.delete_entry(id)?;
                Ok(editor.save(self))
            }
        }
    }

    /// Replace the entries of one day with an editor's result.
    ///
    /// The day's block takes the position of its first existing entry so
    /// other days keep their order.
    pub(crate) fn with_day(&self, date: NaiveDate, day: Vec<Entry>, next_seq: u64) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        let mut day = Some(day);
        for entry in &self.entries {
            if entry.date == date {
                if let Some(day) = day.take() {
                    entries.extend(day);
                }
            } else {
                entries.push(entry.clone());
            }
        }
        if let Some(day) = day {
            entries.extend(day);
        }

        Self {
            user_id: self.user_id.clone(),
            window: self.window,
            entries,
            next_seq: next_seq.max(self.next_seq),
        }
    }

    fn date_of(&self, id: &EntryId) -> Result<NaiveDate> {
        self.get(id)
            .map(|entry| entry.date)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}
