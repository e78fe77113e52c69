use serde::{Deserialize, Serialize};

use crate::model::ids::SubjectId;

/// Locally cached "where was I" for a subject.
///
/// The index is provisional until the question list is known; call
/// [`SessionPosition::clamped`] once it is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPosition {
    subject_id: SubjectId,
    current_index: usize,
}

impl SessionPosition {
    #[must_use]
    pub fn new(subject_id: SubjectId, current_index: usize) -> Self {
        Self {
            subject_id,
            current_index,
        }
    }

    /// Position at the first question.
    #[must_use]
    pub fn start(subject_id: SubjectId) -> Self {
        Self::new(subject_id, 0)
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Clamp into `[0, len - 1]`. Returns `None` when there are no questions.
    #[must_use]
    pub fn clamped(self, len: usize) -> Option<Self> {
        let last = len.checked_sub(1)?;
        Some(Self::new(self.subject_id, self.current_index.min(last)))
    }

    /// Step forward, never past the last index of a `len`-sized list.
    #[must_use]
    pub fn advanced(self, len: usize) -> Option<Self> {
        Self::new(self.subject_id, self.current_index.saturating_add(1)).clamped(len)
    }

    /// Step back, never below zero.
    #[must_use]
    pub fn retreated(self) -> Self {
        Self::new(self.subject_id, self.current_index.saturating_sub(1))
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    #[must_use]
    pub fn is_last(&self, len: usize) -> bool {
        len.checked_sub(1) == Some(self.current_index)
    }
}
