use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("attempt for question {0} is already closed")]
    AlreadyClosed(QuestionId),

    #[error("end_time is before start_time")]
    InvalidTimeRange,
}

/// One attempt: the interval a question was current, bounded by the
/// `start`/`end` calls issued for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionHistoryEntry {
    question_id: QuestionId,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    is_correct: Option<bool>,
}

impl QuestionHistoryEntry {
    /// Open a new attempt at `started_at`.
    #[must_use]
    pub fn open(question_id: QuestionId, started_at: DateTime<Utc>) -> Self {
        Self {
            question_id,
            start_time: started_at,
            end_time: None,
            is_correct: None,
        }
    }

    /// Close the attempt.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::AlreadyClosed` if `close` was already called and
    /// `HistoryError::InvalidTimeRange` if `ended_at` precedes the start.
    pub fn close(&mut self, ended_at: DateTime<Utc>) -> Result<(), HistoryError> {
        if self.end_time.is_some() {
            return Err(HistoryError::AlreadyClosed(self.question_id));
        }
        if ended_at < self.start_time {
            return Err(HistoryError::InvalidTimeRange);
        }
        self.end_time = Some(ended_at);
        Ok(())
    }

    /// Record the correctness of the answer chosen during this attempt.
    /// The latest choice wins.
    pub fn record_answer(&mut self, is_correct: bool) {
        self.is_correct = Some(is_correct);
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Time spent on the question, once the attempt is closed.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}
