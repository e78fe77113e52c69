use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{SchoolId, SubjectId};

/// Completion percentage at which the server considers a subject done.
pub const COMPLETE_PERCENT: f64 = 100.0;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,

    #[error("user progress must be within 0..=100, got {0}")]
    ProgressOutOfRange(f64),
}

/// A course topic containing an ordered set of questions.
///
/// `user_progress` is owned by the server: the client reads it to decide
/// whether entering the subject resumes or restarts, and never computes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SubjectRecord", into = "SubjectRecord")]
pub struct Subject {
    id: SubjectId,
    school_id: SchoolId,
    name: String,
    question_count: u32,
    user_progress: f64,
}

impl Subject {
    /// Build a validated subject.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyName` for a blank name and
    /// `SubjectError::ProgressOutOfRange` when progress is outside `0..=100`.
    pub fn new(
        id: SubjectId,
        school_id: SchoolId,
        name: impl Into<String>,
        question_count: u32,
        user_progress: f64,
    ) -> Result<Self, SubjectError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SubjectError::EmptyName);
        }
        if !(0.0..=COMPLETE_PERCENT).contains(&user_progress) {
            return Err(SubjectError::ProgressOutOfRange(user_progress));
        }
        Ok(Self {
            id,
            school_id,
            name,
            question_count,
            user_progress,
        })
    }

    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn school_id(&self) -> SchoolId {
        self.school_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn user_progress(&self) -> f64 {
        self.user_progress
    }

    /// The same subject with its progress cleared, as after a server reset.
    #[must_use]
    pub fn with_progress_cleared(mut self) -> Self {
        self.user_progress = 0.0;
        self
    }

    /// Whether the server reports this subject as fully completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.user_progress >= COMPLETE_PERCENT
    }
}

/// Wire shape of a subject as returned by `/subjects/school`.
///
/// Decoding is lenient: progress is clamped into `0..=100` so one odd row
/// never loses the whole catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectRecord {
    id: SubjectId,
    school_id: SchoolId,
    name: String,
    #[serde(default)]
    question_count: u32,
    #[serde(default)]
    user_progress: f64,
}

impl From<SubjectRecord> for Subject {
    fn from(record: SubjectRecord) -> Self {
        let user_progress = if record.user_progress.is_nan() {
            0.0
        } else {
            record.user_progress.clamp(0.0, COMPLETE_PERCENT)
        };
        Self {
            id: record.id,
            school_id: record.school_id,
            name: record.name,
            question_count: record.question_count,
            user_progress,
        }
    }
}

impl From<Subject> for SubjectRecord {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            school_id: subject.school_id,
            name: subject.name,
            question_count: subject.question_count,
            user_progress: subject.user_progress,
        }
    }
}
