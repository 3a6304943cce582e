//! Editor session state shared by all front-ends.

/// Lifecycle phase of an editor session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// Accepting edits
    #[default]
    Idle,
    /// A commit is in flight; edits and submits are rejected
    Committing,
    /// A commit was only partially applied; the baseline must be re-fetched
    ReloadRequired,
}

impl SessionPhase {
    /// Whether a commit is in flight
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Committing)
    }
}
