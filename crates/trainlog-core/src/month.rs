//! Calendar presentation of a working set
//!
//! Turns entry-level statuses into one status per day and collapses fully
//! deleted `(date, period)` buckets into a single display row.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{DateWindow, Entry, EntryId, EntryStatus, Hours, Period};

/// One line of a day's listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRow {
    /// Entries represented by this row; several for a merged row
    pub ids: Vec<EntryId>,
    pub date: NaiveDate,
    pub hours: Hours,
    pub status: EntryStatus,
    pub is_deleted: bool,
    /// Synthesized from a fully deleted bucket
    pub merged: bool,
}

/// Display state of a single calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: NaiveDate,
    pub status: EntryStatus,
    /// Hours of all entries not marked deleted
    pub net_total: Hours,
    pub rows: Vec<DayRow>,
}

/// Display state of every day in a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub window: DateWindow,
    pub days: Vec<DaySummary>,
}

impl MonthView {
    /// Net hours over the whole window
    pub fn total(&self) -> Hours {
        self.days.iter().map(|day| day.net_total).sum()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DaySummary> {
        self.days.iter().find(|day| day.date == date)
    }

    /// Days whose status is not `unchanged`
    pub fn changed_days(&self) -> impl Iterator<Item = &DaySummary> {
        self.days
            .iter()
            .filter(|day| day.status != EntryStatus::Unchanged)
    }
}

/// Derives calendar display state from status-annotated entries.
pub struct MonthPresenter;

impl MonthPresenter {
    /// Build the view for `window` from an annotated entry list
    /// (normally [`DiffReport::annotated`](crate::diff::DiffReport)).
    pub fn present(annotated: &[Entry], window: DateWindow) -> MonthView {
        let mut by_day: BTreeMap<NaiveDate, Vec<&Entry>> = BTreeMap::new();
        for entry in annotated {
            if window.contains(entry.date) {
                by_day.entry(entry.date).or_default().push(entry);
            }
        }

        let days = window
            .days()
            .map(|date| {
                let entries = by_day.remove(&date).unwrap_or_default();
                DaySummary {
                    date,
                    status: day_status(entries.iter().copied()),
                    net_total: net_total(entries.iter().copied()),
                    rows: day_rows(entries.iter().copied()),
                }
            })
            .collect();

        MonthView { window, days }
    }
}

/// Aggregate status of one day's entries.
///
/// Added and deleted hours that offset each other exactly leave the day
/// `unchanged`, even when distinct entries were touched.
pub fn day_status<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> EntryStatus {
    let mut added = Hours::ZERO;
    let mut deleted = Hours::ZERO;
    let mut net = Hours::ZERO;
    let mut has_updated = false;

    for entry in entries {
        let removed = entry.status == EntryStatus::Deleted || entry.is_deleted;
        if entry.status == EntryStatus::Added && !entry.is_deleted {
            added += entry.period;
        }
        if removed {
            deleted += entry.period;
        }
        if !entry.is_deleted {
            net += entry.period;
        }
        if entry.status == EntryStatus::Updated && !removed {
            has_updated = true;
        }
    }

    if added == deleted && !has_updated {
        EntryStatus::Unchanged
    } else if !net.is_zero() {
        if has_updated || !deleted.is_zero() {
            EntryStatus::Updated
        } else {
            EntryStatus::Added
        }
    } else {
        EntryStatus::Deleted
    }
}

/// Hours of the entries not marked deleted
pub fn net_total<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Hours {
    entries
        .into_iter()
        .filter(|entry| !entry.is_deleted)
        .map(|entry| entry.period)
        .sum()
}

/// Rows for one day's listing.
///
/// Entries are bucketed by `(date, period)` in first-seen order. A bucket
/// whose entries are all deleted becomes one merged row holding the hours of
/// its persisted members only, or nothing if it has none. Other buckets list
/// their entries individually, skipping deleted drafts.
pub fn day_rows<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Vec<DayRow> {
    let mut buckets: Vec<((NaiveDate, Period), Vec<&Entry>)> = Vec::new();
    for entry in entries {
        let key = (entry.date, entry.period);
        if let Some(index) = buckets.iter().position(|(bucket, _)| *bucket == key) {
            buckets[index].1.push(entry);
        } else {
            buckets.push((key, vec![entry]));
        }
    }

    let mut rows = Vec::new();
    for ((date, _), members) in buckets {
        if members.iter().all(|entry| entry.is_deleted) {
            rows.extend(merged_deleted_row(date, &members));
            continue;
        }
        rows.extend(
            members
                .into_iter()
                .filter(|entry| !(entry.is_deleted && entry.is_draft()))
                .map(|entry| DayRow {
                    ids: vec![entry.id.clone()],
                    date: entry.date,
                    hours: entry.period.into(),
                    status: entry.status,
                    is_deleted: entry.is_deleted,
                    merged: false,
                }),
        );
    }
    rows
}

fn merged_deleted_row(date: NaiveDate, members: &[&Entry]) -> Option<DayRow> {
    let persisted: Vec<&Entry> = members
        .iter()
        .copied()
        .filter(|entry| !entry.is_draft())
        .collect();
    if persisted.is_empty() {
        return None;
    }

    Some(DayRow {
        ids: persisted.iter().map(|entry| entry.id.clone()).collect(),
        date,
        hours: persisted.iter().map(|entry| entry.period).sum(),
        status: EntryStatus::Deleted,
        is_deleted: true,
        merged: persisted.len() > 1,
    })
}
