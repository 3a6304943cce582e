//! Change-set computation between a baseline and a working set

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{CommitPayload, Entry, EntryId, EntryStatus, EntryUpdate, NewEntry, PersistedId};

/// The minimal set of operations turning the baseline into the working set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Drafts to insert
    pub added: Vec<Entry>,
    /// Persisted entries whose date, period or owner changed
    pub updated: Vec<Entry>,
    /// Persisted entries to remove
    pub deleted: Vec<PersistedId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Wire form handed to the batch-write collaborator
    pub fn to_payload(&self) -> CommitPayload {
        CommitPayload {
            added: self.added.iter().map(NewEntry::from).collect(),
            updated: self
                .updated
                .iter()
                .filter_map(|entry| {
                    entry.persisted_id().map(|id| EntryUpdate {
                        id: id.clone(),
                        user_id: entry.user_id.clone(),
                        date: entry.date,
                        period: entry.period,
                    })
                })
                .collect(),
            deleted: self.deleted.clone(),
        }
    }

    /// Replay the change-set onto `baseline`.
    ///
    /// Deleted entries are dropped, updated ones replaced in place, and added
    /// ones appended with their draft ids. All results are unannotated.
    pub fn apply_to(&self, baseline: &[Entry]) -> Vec<Entry> {
        let deleted: HashSet<&PersistedId> = self.deleted.iter().collect();
        let updated: HashMap<&EntryId, &Entry> =
            self.updated.iter().map(|entry| (&entry.id, entry)).collect();

        baseline
            .iter()
            .filter(|entry| {
                entry
                    .persisted_id()
                    .map_or(true, |id| !deleted.contains(id))
            })
            .map(|entry| {
                updated
                    .get(&entry.id)
                    .map_or_else(|| entry.clone(), |update| (*update).clone())
                    .into_clean()
            })
            .chain(self.added.iter().cloned().map(Entry::into_clean))
            .collect()
    }
}

/// Result of [`diff`]: the change-set plus a status-annotated display view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub changes: ChangeSet,
    /// One entry per id, tagged with its status relative to the baseline
    pub annotated: Vec<Entry>,
}

/// Compute the change-set between `baseline` and `working`.
///
/// Pure: the same two snapshots always yield the same sets.
pub fn diff(baseline: &[Entry], working: &[Entry]) -> DiffReport {
    let baseline_by_id: HashMap<&EntryId, &Entry> =
        baseline.iter().map(|entry| (&entry.id, entry)).collect();
    let working_by_id: HashMap<&EntryId, &Entry> =
        working.iter().map(|entry| (&entry.id, entry)).collect();

    let mut changes = ChangeSet::default();
    let mut recorded: HashSet<PersistedId> = HashSet::new();
    let mut annotated = Annotated::default();

    for entry in baseline {
        let removed = working_by_id
            .get(&entry.id)
            .map_or(true, |current| current.is_deleted);
        if !removed {
            continue;
        }
        if let Some(id) = entry.persisted_id() {
            if recorded.insert(id.clone()) {
                changes.deleted.push(id.clone());
            }
        }
        let mut copy = entry.with_status(EntryStatus::Deleted);
        copy.is_deleted = true;
        annotated.put(copy);
    }

    for entry in working {
        if entry.is_deleted {
            // A deleted draft never existed server-side.
            let Some(id) = entry.persisted_id() else {
                continue;
            };
            if recorded.insert(id.clone()) {
                changes.deleted.push(id.clone());
            }
            annotated.put(entry.with_status(EntryStatus::Deleted));
        } else if let Some(original) = baseline_by_id.get(&entry.id) {
            if original.same_values(entry) {
                annotated.put(entry.with_status(EntryStatus::Unchanged));
            } else {
                let updated = entry.with_status(EntryStatus::Updated);
                changes.updated.push(updated.clone());
                annotated.put(updated);
            }
        } else {
            if !entry.is_draft() {
                tracing::warn!(id = %entry.id, "Persisted entry missing from baseline; treating as added");
            }
            let added = entry.with_status(EntryStatus::Added);
            changes.added.push(added.clone());
            annotated.put(added);
        }
    }

    for entry in baseline {
        let untouched = entry
            .persisted_id()
            .map_or(true, |id| !recorded.contains(id))
            && !annotated.contains(&entry.id);
        if untouched {
            annotated.put(entry.with_status(EntryStatus::Unchanged));
        }
    }

    DiffReport {
        changes,
        annotated: annotated.into_entries(),
    }
}

/// Insertion-ordered, last-write-wins map from id to annotated entry
#[derive(Default)]
struct Annotated {
    positions: HashMap<EntryId, usize>,
    entries: Vec<Entry>,
}

impl Annotated {
    fn put(&mut self, entry: Entry) {
        if let Some(&position) = self.positions.get(&entry.id) {
            self.entries[position] = entry;
        } else {
            self.positions.insert(entry.id.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    fn contains(&self, id: &EntryId) -> bool {
        self.positions.contains_key(id)
    }

    fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::config::EditorConfig;
    use crate::models::{DateWindow, Period, UserId};
    use crate::working_set::{Baseline, EditAction, WorkingSet};

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn hours(value: f64) -> Period {
        Period::from_hours(value).unwrap()
    }

    fn pid(id: &str) -> EntryId {
        EntryId::Persisted(PersistedId::new(id))
    }

    fn persisted(id: &str, date: NaiveDate, period: f64) -> Entry {
        Entry::persisted(PersistedId::new(id), user(), date, hours(period), 1, 1)
    }

    fn baseline(entries: Vec<Entry>) -> Baseline {
        Baseline::new(user(), DateWindow::month(2024, 5).unwrap(), entries).unwrap()
    }

    fn apply_all(working: &WorkingSet, actions: &[EditAction]) -> WorkingSet {
        let config = EditorConfig::default();
        actions.iter().fold(working.clone(), |current, action| {
            current.apply(action, &config).unwrap()
        })
    }

    fn status_of(report: &DiffReport, id: &EntryId) -> Option<EntryStatus> {
        report
            .annotated
            .iter()
            .find(|entry| &entry.id == id)
            .map(|entry| entry.status)
    }

    /// Non-deleted working entries without annotations, sorted for comparison
    fn persisted_view(entries: &[Entry]) -> Vec<Entry> {
        let mut view: Vec<Entry> = entries
            .iter()
            .filter(|entry| !entry.is_deleted)
            .cloned()
            .map(|entry| Entry {
                updated_at: 0,
                ..entry.into_clean()
            })
            .collect();
        view.sort_by_key(|entry| entry.id.to_string());
        view
    }

    #[test]
    fn test_diff_of_baseline_with_itself_is_empty() {
        let base = baseline(vec![persisted("a1", day(1), 1.0), persisted("a2", day(2), 2.0)]);
        let report = diff(base.entries(), base.entries());

        assert!(report.changes.is_empty());
        assert_eq!(report.annotated.len(), 2);
        assert!(report
            .annotated
            .iter()
            .all(|entry| entry.status == EntryStatus::Unchanged));
    }

    #[test]
    fn test_diff_classifies_each_group() {
        let base = baseline(vec![
            persisted("a1", day(1), 1.0),
            persisted("a2", day(2), 2.0),
            persisted("a3", day(3), 3.0),
        ]);
        let working = WorkingSet::from_baseline(&base);
        let working = apply_all(
            &working,
            &[
                EditAction::EditPeriod {
                    id: pid("a1"),
                    period: hours(1.5),
                },
                EditAction::Delete { id: pid("a2") },
                EditAction::Add { date: day(4) },
            ],
        );

        let report = diff(base.entries(), working.entries());

        assert_eq!(report.changes.updated.len(), 1);
        assert_eq!(report.changes.updated[0].id, pid("a1"));
        assert_eq!(report.changes.updated[0].period, hours(1.5));
        assert_eq!(report.changes.deleted, vec![PersistedId::new("a2")]);
        assert_eq!(report.changes.added.len(), 1);
        assert_eq!(report.changes.added[0].date, day(4));

        assert_eq!(status_of(&report, &pid("a1")), Some(EntryStatus::Updated));
        assert_eq!(status_of(&report, &pid("a2")), Some(EntryStatus::Deleted));
        assert_eq!(status_of(&report, &pid("a3")), Some(EntryStatus::Unchanged));
        assert_eq!(report.annotated.len(), 4);
    }

    #[test]
    fn test_edit_back_to_original_is_not_an_update() {
        let base = baseline(vec![persisted("a1", day(1), 1.0)]);
        let working = apply_all(
            &WorkingSet::from_baseline(&base),
            &[
                EditAction::EditPeriod {
                    id: pid("a1"),
                    period: hours(2.0),
                },
                EditAction::EditPeriod {
                    id: pid("a1"),
                    period: hours(1.0),
                },
            ],
        );

        let report = diff(base.entries(), working.entries());
        assert!(report.changes.is_empty());
        assert_eq!(status_of(&report, &pid("a1")), Some(EntryStatus::Unchanged));
    }

    #[test]
    fn test_draft_added_then_deleted_leaves_no_trace() {
        let base = baseline(vec![persisted("a1", day(1), 1.0)]);
        let working = WorkingSet::from_baseline(&base);
        let config = EditorConfig::default();

        let mut editor = working.day_editor(day(5), &config).unwrap();
        let draft = editor.add_entry();
        editor.delete_entry(&draft).unwrap();
        let working = editor.save(&working);

        let report = diff(base.entries(), working.entries());
        assert!(report.changes.is_empty());
        assert_eq!(status_of(&report, &draft), None);
        assert_eq!(report.annotated.len(), 1);
    }

    #[test]
    fn test_value_based_restore_yields_empty_diff() {
        let base = baseline(vec![persisted("a1", day(1), 1.5)]);
        let working = apply_all(
            &WorkingSet::from_baseline(&base),
            &[
                EditAction::Delete { id: pid("a1") },
                EditAction::Add { date: day(1) },
            ],
        );

        let entry = working.get(&pid("a1")).unwrap();
        assert!(!entry.is_deleted);
        assert!(working.entries().iter().all(|entry| !entry.is_draft()));

        let report = diff(base.entries(), working.entries());
        assert!(report.changes.added.is_empty());
        assert!(report.changes.deleted.is_empty());
        assert!(report.changes.updated.is_empty());
    }

    #[test]
    fn test_baseline_entry_missing_from_working_is_deleted() {
        let base = baseline(vec![persisted("a1", day(1), 1.0), persisted("a2", day(1), 1.0)]);
        let working = vec![base.entries()[1].clone()];

        let report = diff(base.entries(), &working);

        assert_eq!(report.changes.deleted, vec![PersistedId::new("a1")]);
        let deleted = report
            .annotated
            .iter()
            .find(|entry| entry.id == pid("a1"))
            .unwrap();
        assert!(deleted.is_deleted);
        assert_eq!(deleted.status, EntryStatus::Deleted);
    }

    #[test]
    fn test_deleted_ids_are_deduplicated() {
        let base = baseline(vec![persisted("a1", day(1), 1.0)]);
        let working = apply_all(
            &WorkingSet::from_baseline(&base),
            &[EditAction::Delete { id: pid("a1") }],
        );

        let report = diff(base.entries(), working.entries());
        assert_eq!(report.changes.deleted, vec![PersistedId::new("a1")]);
        assert_eq!(report.annotated.len(), 1);
    }

    #[test]
    fn test_diff_is_order_independent() {
        let base = baseline(vec![
            persisted("a1", day(1), 1.0),
            persisted("a2", day(2), 2.0),
            persisted("a3", day(3), 3.0),
        ]);
        let working = apply_all(
            &WorkingSet::from_baseline(&base),
            &[
                EditAction::Delete { id: pid("a3") },
                EditAction::EditPeriod {
                    id: pid("a2"),
                    period: hours(0.5),
                },
                EditAction::Add { date: day(9) },
            ],
        );

        let forward = diff(base.entries(), working.entries());
        let mut reversed_base = base.entries().to_vec();
        reversed_base.reverse();
        let mut reversed_working = working.entries().to_vec();
        reversed_working.reverse();
        let backward = diff(&reversed_base, &reversed_working);

        let sorted = |entries: &[Entry]| {
            let mut ids: Vec<String> = entries.iter().map(|e| e.id.to_string()).collect();
            ids.sort();
            ids
        };
        assert_eq!(sorted(&forward.changes.added), sorted(&backward.changes.added));
        assert_eq!(
            sorted(&forward.changes.updated),
            sorted(&backward.changes.updated)
        );
        assert_eq!(forward.changes.deleted, backward.changes.deleted);
    }

    #[test]
    fn test_payload_drops_draft_ids() {
        let base = baseline(vec![persisted("a1", day(1), 1.0)]);
        let working = apply_all(
            &WorkingSet::from_baseline(&base),
            &[
                EditAction::Add { date: day(2) },
                EditAction::EditPeriod {
                    id: pid("a1"),
                    period: hours(2.5),
                },
            ],
        );

        let payload = diff(base.entries(), working.entries()).changes.to_payload();
        assert_eq!(
            payload.added,
            vec![NewEntry {
                user_id: user(),
                date: day(2),
                period: Period::DEFAULT,
            }]
        );
        assert_eq!(payload.updated.len(), 1);
        assert_eq!(payload.updated[0].id, PersistedId::new("a1"));
        assert_eq!(payload.updated[0].period, hours(2.5));
        assert!(payload.deleted.is_empty());
    }

    /// Raw edit step; indices pick among the entries live at that point
    #[derive(Debug, Clone)]
    enum Step {
        Add(u32),
        Edit(usize, u8),
        Delete(usize),
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            (1_u32..=3).prop_map(Step::Add),
            (any::<usize>(), 1_u8..=10).prop_map(|(index, halves)| Step::Edit(index, halves)),
            any::<usize>().prop_map(Step::Delete),
        ]
    }

    fn to_action(working: &WorkingSet, step: &Step) -> EditAction {
        let live: Vec<EntryId> = working
            .entries()
            .iter()
            .filter(|entry| !entry.is_deleted)
            .map(|entry| entry.id.clone())
            .collect();
        match step {
            Step::Edit(index, halves) if !live.is_empty() => EditAction::EditPeriod {
                id: live[index % live.len()].clone(),
                period: Period::from_halves(*halves).unwrap(),
            },
            Step::Delete(index) if !live.is_empty() => EditAction::Delete {
                id: live[index % live.len()].clone(),
            },
            Step::Add(d) => EditAction::Add { date: day(*d) },
            Step::Edit(..) | Step::Delete(_) => EditAction::Add { date: day(1) },
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]
        #[test]
        fn test_change_set_replays_onto_baseline(
            steps in prop::collection::vec(step_strategy(), 0..16)
        ) {
            let base = baseline(vec![
                persisted("a1", day(1), 1.5),
                persisted("a2", day(1), 2.0),
                persisted("a3", day(2), 1.5),
                persisted("a4", day(3), 5.0),
            ]);
            let config = EditorConfig::default();
            let mut working = WorkingSet::from_baseline(&base);
            for step in &steps {
                let action = to_action(&working, step);
                working = working.apply(&action, &config).unwrap();
            }

            let report = diff(base.entries(), working.entries());
            let replayed = report.changes.apply_to(base.entries());
            prop_assert_eq!(persisted_view(&replayed), persisted_view(working.entries()));
            prop_assert!(report
                .changes
                .added
                .iter()
                .all(|entry| entry.is_draft() && !entry.is_deleted));
        }
    }
}
