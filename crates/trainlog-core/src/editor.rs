//! Per-day editor
//!
//! Operates on the entries of a single date. Besides plain add/edit/delete it
//! applies two value-based restore heuristics that cancel an add against a
//! previously deleted persisted entry of the same `(user, date, period)`, so
//! that a delete followed by an equivalent add never produces a spurious
//! delete+add pair in the change-set.
//!
//! When several deleted entries match, the most recently deleted one is
//! restored.

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::models::{Entry, EntryId, EntryStatus, Period, UserId};
use crate::util::unix_timestamp_millis;
use crate::working_set::WorkingSet;

/// Editing view over one day of a [`WorkingSet`].
#[derive(Debug, Clone)]
pub struct DayEditor {
    user_id: UserId,
    date: NaiveDate,
    default_period: Period,
    entries: Vec<Entry>,
    next_seq: u64,
    revision: u64,
}

impl DayEditor {
    pub(crate) const fn new(
        user_id: UserId,
        date: NaiveDate,
        default_period: Period,
        entries: Vec<Entry>,
        next_seq: u64,
    ) -> Self {
        Self {
            user_id,
            date,
            default_period,
            entries,
            next_seq,
            revision: 0,
        }
    }

    /// Tag the editor with the session revision it was opened at
    #[must_use]
    pub(crate) fn at_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub(crate) const fn revision(&self) -> u64 {
        self.revision
    }

    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Entries of the day, deleted ones included
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Add a session of the default period.
    ///
    /// Restores a deleted persisted entry of the default period instead of
    /// creating a draft when one exists. Returns the id of the visible entry.
    pub fn add_entry(&mut self) -> EntryId {
        if let Some(index) = self.restorable(self.default_period) {
            let id = self.restore(index);
            tracing::debug!(%id, date = %self.date, "Add absorbed by restoring deleted entry");
            return id;
        }

        let entry = Entry::draft(self.user_id.clone(), self.date, self.default_period);
        let id = entry.id.clone();
        tracing::debug!(%id, date = %self.date, period = %entry.period, "Added draft entry");
        self.entries.push(entry);
        id
    }

    /// Change an entry's duration.
    ///
    /// A draft edited to the values of a deleted persisted entry is discarded
    /// and that entry restored. Returns the id of the entry now holding the
    /// edited value.
    pub fn edit_period(&mut self, id: &EntryId, period: Period) -> Result<EntryId> {
        let index = self.index_of(id)?;
        let now = unix_timestamp_millis();
        let entry = &mut self.entries[index];
        if entry.is_deleted {
            return Err(Error::EntryDeleted(id.to_string()));
        }

        if entry.original_period.is_none() {
            entry.original_period = Some(entry.period);
        }
        entry.period = period;
        entry.updated_at = now;
        entry.status = match entry.status {
            EntryStatus::Added => EntryStatus::Added,
            _ => EntryStatus::Updated,
        };
        tracing::debug!(%id, %period, status = %entry.status, "Edited entry period");

        if !entry.is_draft() {
            return Ok(id.clone());
        }

        match self.restorable(period) {
            Some(restore_index) => {
                let restored = self.restore(restore_index);
                // Indices shift once the draft is removed, so look it up again.
                let draft_index = self.index_of(id)?;
                self.entries.remove(draft_index);
                tracing::debug!(draft = %id, %restored, "Edit absorbed by restoring deleted entry");
                Ok(restored)
            }
            None => Ok(id.clone()),
        }
    }

    /// Delete an entry.
    ///
    /// Drafts are removed outright. Persisted entries get their original
    /// period back and are marked deleted. Deleting an already deleted entry
    /// does nothing.
    pub fn delete_entry(&mut self, id: &EntryId) -> Result<()> {
        let index = self.index_of(id)?;
        if self.entries[index].is_draft() {
            self.entries.remove(index);
            tracing::debug!(%id, "Discarded draft entry");
            return Ok(());
        }

        let seq = self.next_seq;
        let entry = &mut self.entries[index];
        if entry.is_deleted {
            return Ok(());
        }

        if let Some(original) = entry.original_period.take() {
            entry.period = original;
        }
        entry.is_deleted = true;
        entry.status = EntryStatus::Deleted;
        entry.deleted_seq = Some(seq);
        entry.updated_at = unix_timestamp_millis();
        self.next_seq += 1;
        tracing::debug!(%id, period = %entry.period, "Marked entry deleted");
        Ok(())
    }

    /// Hand the day's entries back to the working set.
    pub fn save(self, working: &WorkingSet) -> WorkingSet {
        working.with_day(self.date, self.entries, self.next_seq)
    }

    fn index_of(&self, id: &EntryId) -> Result<usize> {
        self.entries
            .iter()
            .position(|entry| &entry.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Deleted persisted entry of this user and day with the given period,
    /// preferring the most recently deleted.
    fn restorable(&self, period: Period) -> Option<usize> {
        let candidates: Vec<_> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                !entry.is_draft()
                    && entry.is_deleted
                    && entry.user_id == self.user_id
                    && entry.date == self.date
                    && entry.period == period
            })
            .collect();
        if candidates.len() > 1 {
            tracing::debug!(
                count = candidates.len(),
                date = %self.date,
                %period,
                "Several deleted entries match; restoring the most recently deleted"
            );
        }
        candidates
            .into_iter()
            .max_by_key(|(index, entry)| (entry.deleted_seq, *index))
            .map(|(index, _)| index)
    }

    fn restore(&mut self, index: usize) -> EntryId {
        let entry = &mut self.entries[index];
        entry.is_deleted = false;
        entry.status = EntryStatus::Unchanged;
        entry.original_period = None;
        entry.deleted_seq = None;
        entry.updated_at = unix_timestamp_millis();
        entry.id.clone()
    }
}
