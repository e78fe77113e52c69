use std::fmt;

/// Where a learning session is in its lifecycle.
///
/// `Idle → Loading → Active(i) → Advancing → Active(i') | Finished`, with
/// `Empty` and `Failed` as load outcomes and `Closed` once torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Active { index: usize },
    Advancing { from: usize },
    Finished { index: usize },
    /// Loaded, but the subject has no questions.
    Empty,
    /// The question list could not be fetched.
    Failed,
    Closed,
}

impl SessionState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Active { .. } => "active",
            SessionState::Advancing { .. } => "advancing",
            SessionState::Finished { .. } => "finished",
            SessionState::Empty => "empty",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        }
    }

    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        match self {
            SessionState::Active { index } => Some(*index),
            _ => None,
        }
    }

    /// No further navigation is possible from this state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Finished { .. } | SessionState::Empty | SessionState::Closed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active { index } => write!(f, "active({index})"),
            SessionState::Advancing { from } => write!(f, "advancing(from {from})"),
            SessionState::Finished { index } => write!(f, "finished({index})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved { from: usize, to: usize },
    /// The index did not change.
    Unchanged,
}
