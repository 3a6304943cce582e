//! Editor session: baseline, working set and the commit lifecycle

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::EditorConfig;
use crate::diff::{diff, DiffReport};
use crate::editor::DayEditor;
use crate::error::{Error, Result};
use crate::models::{CommitPayload, DateWindow, Entry, UserId};
use crate::month::{MonthPresenter, MonthView};
use crate::state::SessionPhase;
use crate::store::EntryStore;
use crate::working_set::{Baseline, EditAction, WorkingSet};

/// Proof that a commit was started; hand it back to
/// [`EditorSession::finish_commit`] together with the store's answer, or to
/// [`EditorSession::abort_commit`] when the store was never asked.
#[must_use = "an unsettled ticket leaves the session busy"]
#[derive(Debug, PartialEq, Eq)]
pub struct CommitTicket {
    payload: CommitPayload,
    revision: u64,
}

impl CommitTicket {
    pub const fn payload(&self) -> &CommitPayload {
        &self.payload
    }
}

/// Counts of what a successful commit sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl CommitSummary {
    pub const fn is_empty(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.deleted == 0
    }
}

impl From<&CommitPayload> for CommitSummary {
    fn from(payload: &CommitPayload) -> Self {
        Self {
            added: payload.added.len(),
            updated: payload.updated.len(),
            deleted: payload.deleted.len(),
        }
    }
}

/// One user's editing session over a date window.
pub struct EditorSession<S: EntryStore> {
    store: S,
    config: EditorConfig,
    baseline: Baseline,
    working: WorkingSet,
    phase: SessionPhase,
    /// Bumped whenever the working set is replaced
    revision: u64,
}

impl<S: EntryStore> EditorSession<S> {
    /// Fetch the baseline and start editing.
    ///
    /// Any fetch or validation failure is reported as [`Error::Load`].
    pub async fn load(
        store: S,
        user_id: UserId,
        window: DateWindow,
        config: EditorConfig,
    ) -> Result<Self> {
        let baseline = fetch(&store, &user_id, window).await?;
        tracing::info!(
            "Loaded {} entries for {} in {}",
            baseline.entries().len(),
            user_id,
            window
        );

        Ok(Self {
            working: WorkingSet::from_baseline(&baseline),
            store,
            config,
            baseline,
            phase: SessionPhase::Idle,
            revision: 0,
        })
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub const fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub const fn working(&self) -> &WorkingSet {
        &self.working
    }

    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub const fn window(&self) -> DateWindow {
        self.baseline.window()
    }

    /// Apply one edit to the working set
    pub fn apply(&mut self, action: &EditAction) -> Result<()> {
        self.ensure_editable()?;
        let working = self.working.apply(action, &self.config)?;
        self.replace_working(working);
        Ok(())
    }

    /// Open the per-day editor for `date`
    pub fn day_editor(&self, date: NaiveDate) -> Result<DayEditor> {
        self.ensure_editable()?;
        Ok(self
            .working
            .day_editor(date, &self.config)?
            .at_revision(self.revision))
    }

    /// Fold a day editor's result back into the working set.
    ///
    /// Rejected with [`Error::StaleEditor`] when the working set changed
    /// after the editor was opened.
    pub fn save_day(&mut self, editor: DayEditor) -> Result<()> {
        self.ensure_editable()?;
        if editor.revision() != self.revision {
            return Err(Error::StaleEditor(editor.date().to_string()));
        }
        let working = editor.save(&self.working);
        self.replace_working(working);
        Ok(())
    }

    /// Current change-set and annotated view against the baseline
    pub fn diff(&self) -> DiffReport {
        diff(self.baseline.entries(), self.working.entries())
    }

    pub fn month_view(&self) -> MonthView {
        MonthPresenter::present(&self.diff().annotated, self.window())
    }

    /// Whether a commit would send anything
    pub fn is_dirty(&self) -> bool {
        !self.diff().changes.is_empty()
    }

    /// Discard every local edit
    pub fn revert(&mut self) -> Result<()> {
        if self.phase.is_busy() {
            return Err(Error::Busy);
        }
        let working = WorkingSet::from_baseline(&self.baseline);
        self.replace_working(working);
        Ok(())
    }

    /// Freeze the current change-set and mark the session busy
    pub fn begin_commit(&mut self) -> Result<CommitTicket> {
        self.ensure_editable()?;
        let payload = self.diff().changes.to_payload();
        self.phase = SessionPhase::Committing;
        Ok(CommitTicket {
            payload,
            revision: self.revision,
        })
    }

    /// Give up on a commit whose payload never reached the store
    pub fn abort_commit(&mut self, ticket: CommitTicket) {
        if self.phase.is_busy() && ticket.revision == self.revision {
            tracing::debug!("Commit aborted before reaching the store");
            self.phase = SessionPhase::Idle;
        }
    }

    /// Settle a commit started with [`begin_commit`](Self::begin_commit).
    ///
    /// On success the returned server state becomes both the baseline and
    /// the working set. On failure both are left as they were.
    ///
    /// A ticket outliving a [`reload`](Self::reload) is refused and the
    /// session asks for another reload, since the store may have applied it.
    pub fn finish_commit(
        &mut self,
        ticket: CommitTicket,
        result: Result<Vec<Entry>>,
    ) -> Result<CommitSummary> {
        if !self.phase.is_busy() || ticket.revision != self.revision {
            tracing::warn!("Commit settled after the session moved on");
            self.phase = SessionPhase::ReloadRequired;
            return Err(Error::Commit(
                "commit no longer matches this session".to_string(),
            ));
        }

        let summary = CommitSummary::from(&ticket.payload);
        match result {
            Ok(entries) => {
                match Baseline::new(self.baseline.user_id().clone(), self.window(), entries) {
                    Ok(baseline) => {
                        self.replace_working(WorkingSet::from_baseline(&baseline));
                        self.baseline = baseline;
                        self.phase = SessionPhase::Idle;
                        tracing::info!(
                            "Committed {} added, {} updated, {} deleted",
                            summary.added,
                            summary.updated,
                            summary.deleted
                        );
                        Ok(summary)
                    }
                    Err(error) => {
                        self.phase = SessionPhase::ReloadRequired;
                        Err(Error::Commit(format!(
                            "server returned an unusable state: {error}"
                        )))
                    }
                }
            }
            Err(Error::PartialCommit(message)) => {
                tracing::warn!("Commit partially applied: {}", message);
                self.phase = SessionPhase::ReloadRequired;
                Err(Error::PartialCommit(message))
            }
            Err(error) => {
                tracing::warn!("Commit failed: {}", error);
                self.phase = SessionPhase::Idle;
                Err(Error::Commit(error.to_string()))
            }
        }
    }

    /// Send the current change-set to the store.
    ///
    /// An empty change-set does not reach the store.
    pub async fn submit(&mut self) -> Result<CommitSummary> {
        self.ensure_editable()?;
        if !self.is_dirty() {
            tracing::debug!("Nothing to commit");
            return Ok(CommitSummary::default());
        }

        let ticket = self.begin_commit()?;
        let guard = CommitGuard::new(&mut self.phase);
        let result = self
            .store
            .commit(
                self.baseline.user_id(),
                self.baseline.window(),
                ticket.payload(),
            )
            .await;
        guard.disarm();
        self.finish_commit(ticket, result)
    }

    /// Re-fetch the baseline and drop every local edit.
    ///
    /// Also the way out of a commit that was never settled; any ticket
    /// still outstanding is refused afterwards.
    pub async fn reload(&mut self) -> Result<()> {
        let baseline = fetch(&self.store, self.baseline.user_id(), self.window()).await?;
        if self.phase.is_busy() {
            tracing::warn!("Reload discarded an unsettled commit");
        }
        self.replace_working(WorkingSet::from_baseline(&baseline));
        self.baseline = baseline;
        self.phase = SessionPhase::Idle;
        Ok(())
    }

    fn replace_working(&mut self, working: WorkingSet) {
        self.working = working;
        self.revision += 1;
    }

    fn ensure_editable(&self) -> Result<()> {
        match self.phase {
            SessionPhase::Idle => Ok(()),
            SessionPhase::Committing => Err(Error::Busy),
            SessionPhase::ReloadRequired => Err(Error::ReloadRequired),
        }
    }
}

/// Marks the session for reload if a commit future is dropped while the
/// store call is pending; the store may or may not have applied it.
struct CommitGuard<'a> {
    phase: Option<&'a mut SessionPhase>,
}

impl<'a> CommitGuard<'a> {
    const fn new(phase: &'a mut SessionPhase) -> Self {
        Self { phase: Some(phase) }
    }

    fn disarm(mut self) {
        self.phase = None;
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        if let Some(phase) = self.phase.take() {
            tracing::warn!("Commit cancelled before the store answered");
            *phase = SessionPhase::ReloadRequired;
        }
    }
}

async fn fetch<S: EntryStore>(store: &S, user_id: &UserId, window: DateWindow) -> Result<Baseline> {
    let entries = store
        .fetch_baseline(user_id, window)
        .await
        .map_err(|error| Error::Load(error.to_string()))?;
    Baseline::new(user_id.clone(), window, entries).map_err(|error| Error::Load(error.to_string()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{EntryId, EntryStatus, Period, PersistedId};
    use crate::store::{MemoryEntryStore, StoreFailure};

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn may() -> DateWindow {
        DateWindow::month(2024, 5).unwrap()
    }

    fn persisted(id: &str, date: NaiveDate, hours: f64) -> Entry {
        Entry::persisted(
            PersistedId::new(id),
            user(),
            date,
            Period::from_hours(hours).unwrap(),
            1,
            1,
        )
    }

    fn store() -> MemoryEntryStore {
        MemoryEntryStore::new(vec![
            persisted("a1", day(1), 1.5),
            persisted("a2", day(2), 2.0),
        ])
    }

    async fn session(store: &MemoryEntryStore) -> EditorSession<&MemoryEntryStore> {
        EditorSession::load(store, user(), may(), EditorConfig::default())
            .await
            .unwrap()
    }

    fn a1() -> EntryId {
        EntryId::Persisted(PersistedId::new("a1"))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_commit_resets_baseline_and_working_set() {
        let store = store();
        let mut session = session(&store).await;
        session.apply(&EditAction::Add { date: day(3) }).unwrap();
        session
            .apply(&EditAction::EditPeriod {
                id: a1(),
                period: Period::from_hours(3.0).unwrap(),
            })
            .unwrap();

        let summary = session.submit().await.unwrap();

        assert_eq!(
            summary,
            CommitSummary {
                added: 1,
                updated: 1,
                deleted: 0
            }
        );
        assert!(!session.is_dirty());
        assert_eq!(session.baseline().entries(), session.working().entries());
        assert_eq!(session.baseline().entries(), store.entries().await.as_slice());
        assert!(session.working().entries().iter().all(|e| !e.is_draft()));
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_commit_keeps_edits_for_retry() {
        let store = store();
        let mut session = session(&store).await;
        session.apply(&EditAction::Delete { id: a1() }).unwrap();
        let before = session.working().clone();

        store.fail_next(StoreFailure::Commit).await;
        let result = session.submit().await;

        assert!(matches!(result, Err(Error::Commit(_))));
        assert_eq!(session.working(), &before);
        assert_eq!(session.baseline().entries().len(), 2);
        assert_eq!(session.phase(), SessionPhase::Idle);

        session.submit().await.unwrap();
        assert_eq!(session.baseline().entries().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_in_flight_commit_rejects_edits() {
        let store = store();
        let mut session = session(&store).await;
        session.apply(&EditAction::Add { date: day(4) }).unwrap();

        let ticket = session.begin_commit().unwrap();
        assert_eq!(ticket.payload().added.len(), 1);
        assert!(matches!(
            session.apply(&EditAction::Add { date: day(5) }),
            Err(Error::Busy)
        ));
        assert!(matches!(session.begin_commit(), Err(Error::Busy)));
        assert!(matches!(session.revert(), Err(Error::Busy)));

        let result = store
            .commit(&user(), may(), ticket.payload())
            .await;
        session.finish_commit(ticket, result).unwrap();
        assert!(session.apply(&EditAction::Add { date: day(5) }).is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_partial_failure_requires_reload() {
        let store = store();
        let mut session = session(&store).await;
        session.apply(&EditAction::Delete { id: a1() }).unwrap();
        session.apply(&EditAction::Add { date: day(9) }).unwrap();

        store.fail_next(StoreFailure::PartialCommit).await;
        let result = session.submit().await;

        assert!(matches!(result, Err(Error::PartialCommit(_))));
        assert_eq!(session.phase(), SessionPhase::ReloadRequired);
        assert!(matches!(
            session.apply(&EditAction::Add { date: day(5) }),
            Err(Error::ReloadRequired)
        ));

        session.reload().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.baseline().entries().len(), 1);
        assert!(!session.is_dirty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_failure_yields_no_session() {
        let store = store();
        store.fail_next(StoreFailure::Fetch).await;

        let result = EditorSession::load(&store, user(), may(), EditorConfig::default()).await;

        assert!(matches!(result, Err(Error::Load(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_revert_discards_edits() {
        let store = store();
        let mut session = session(&store).await;
        session.apply(&EditAction::Delete { id: a1() }).unwrap();
        session.apply(&EditAction::Add { date: day(7) }).unwrap();
        assert!(session.is_dirty());

        session.revert().unwrap();

        assert!(!session.is_dirty());
        assert_eq!(session.baseline().entries(), session.working().entries());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_submit_skips_the_store() {
        let store = store();
        let mut session = session(&store).await;
        store.fail_next(StoreFailure::Commit).await;

        let summary = session.submit().await.unwrap();

        assert!(summary.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_day_editor_flow_updates_month_view() {
        let store = store();
        let mut session = session(&store).await;

        let mut editor = session.day_editor(day(2)).unwrap();
        editor.add_entry();
        session.save_day(editor).unwrap();

        let view = session.month_view();
        let summary = view.day(day(2)).unwrap();
        assert_eq!(summary.status, EntryStatus::Added);
        assert_eq!(summary.net_total.hours(), 3.5);
        assert_eq!(view.total().hours(), 5.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_day_editor_opened_before_commit_is_rejected() {
        let store = store();
        let mut session = session(&store).await;
        let stale = session.day_editor(day(1)).unwrap();

        session.apply(&EditAction::Delete { id: a1() }).unwrap();
        session.submit().await.unwrap();
        assert_eq!(store.entries().await.len(), 1);

        assert!(matches!(session.save_day(stale), Err(Error::StaleEditor(_))));
        assert!(!session.is_dirty());
        assert!(session.submit().await.unwrap().is_empty());
        assert_eq!(store.entries().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_day_editor_goes_stale_after_any_working_set_change() {
        let store = store();
        let mut session = session(&store).await;

        let stale = session.day_editor(day(2)).unwrap();
        session.apply(&EditAction::Add { date: day(5) }).unwrap();
        assert!(matches!(session.save_day(stale), Err(Error::StaleEditor(_))));

        let stale = session.day_editor(day(2)).unwrap();
        session.revert().unwrap();
        assert!(matches!(session.save_day(stale), Err(Error::StaleEditor(_))));

        let stale = session.day_editor(day(2)).unwrap();
        session.reload().await.unwrap();
        assert!(matches!(session.save_day(stale), Err(Error::StaleEditor(_))));

        let mut first = session.day_editor(day(2)).unwrap();
        let second = session.day_editor(day(2)).unwrap();
        first.add_entry();
        session.save_day(first).unwrap();
        assert!(matches!(session.save_day(second), Err(Error::StaleEditor(_))));
        assert_eq!(session.diff().changes.added.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unsettled_ticket_can_be_aborted_or_reloaded_away() {
        let store = store();
        let mut session = session(&store).await;
        session.apply(&EditAction::Add { date: day(4) }).unwrap();

        let ticket = session.begin_commit().unwrap();
        session.abort_commit(ticket);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.is_dirty());

        let ticket = session.begin_commit().unwrap();
        assert!(matches!(session.revert(), Err(Error::Busy)));
        session.reload().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.apply(&EditAction::Add { date: day(5) }).is_ok());

        let result = store.commit(&user(), may(), ticket.payload()).await;
        assert!(matches!(
            session.finish_commit(ticket, result),
            Err(Error::Commit(_))
        ));
        assert_eq!(session.phase(), SessionPhase::ReloadRequired);
        session.reload().await.unwrap();
        assert_eq!(session.baseline().entries().len(), 3);
    }

    /// Store whose commits never answer
    struct StalledStore(MemoryEntryStore);

    impl EntryStore for StalledStore {
        async fn fetch_baseline(&self, user_id: &UserId, window: DateWindow) -> Result<Vec<Entry>> {
            self.0.fetch_baseline(user_id, window).await
        }

        async fn commit(
            &self,
            _user_id: &UserId,
            _window: DateWindow,
            _payload: &CommitPayload,
        ) -> Result<Vec<Entry>> {
            std::future::pending().await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancelled_submit_does_not_leave_session_busy() {
        let mut session = EditorSession::load(
            StalledStore(store()),
            user(),
            may(),
            EditorConfig::default(),
        )
        .await
        .unwrap();
        session.apply(&EditAction::Add { date: day(4) }).unwrap();

        tokio::select! {
            biased;
            _ = session.submit() => panic!("stalled store answered"),
            () = std::future::ready(()) => {}
        }

        assert_eq!(session.phase(), SessionPhase::ReloadRequired);
        session.reload().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.is_dirty());
    }
}
