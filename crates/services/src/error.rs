//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{AnswerId, QuestionId, SubjectId};
use storage::StorageError;

/// Errors emitted by the REST collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("request rejected: not authenticated")]
    Unauthorized,
    #[error("request failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Best-effort call failures. Logged and reported, never fatal to navigation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("failed to record start of question {question_id}")]
    Start {
        question_id: QuestionId,
        source: ApiError,
    },
    #[error("failed to record end of question {question_id}")]
    End {
        question_id: QuestionId,
        source: ApiError,
    },
    #[error("failed to update progress for subject {subject_id}")]
    UpdateProgress {
        subject_id: SubjectId,
        source: ApiError,
    },
    #[error("failed to start learning subject {subject_id}")]
    StartLearning {
        subject_id: SubjectId,
        source: ApiError,
    },
}

/// Errors that stop a session transition.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("failed to load questions")]
    Fetch(#[source] ApiError),
    #[error("failed to reset subject progress")]
    Reset(#[source] ApiError),
    #[error("failed to load subjects")]
    Subjects(#[source] ApiError),
    #[error("invalid subject id {0}")]
    InvalidSubject(SubjectId),
    #[error("cannot {action} while the session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("answer {answer_id} does not belong to question {question_id}")]
    UnknownAnswer {
        question_id: QuestionId,
        answer_id: AnswerId,
    },
}

/// Non-fatal problems collected during transitions, for a UI to toast.
#[derive(Debug)]
#[non_exhaustive]
pub enum SessionNotice {
    Telemetry(TelemetryError),
    /// Reading, writing or clearing the cached position failed.
    PositionStore(StorageError),
    /// The question list could not be re-validated; the previous list is kept.
    StaleQuestions(ApiError),
    /// The subject list could not be refreshed after a reset.
    StaleSubjects(ApiError),
}

impl std::fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionNotice::Telemetry(err) => write!(f, "{err}"),
            SessionNotice::PositionStore(err) => write!(f, "position store unavailable: {err}"),
            SessionNotice::StaleQuestions(err) => write!(f, "could not refresh questions: {err}"),
            SessionNotice::StaleSubjects(err) => write!(f, "could not refresh subjects: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_notice_does_not_name_the_operation() {
        let notice = SessionNotice::PositionStore(StorageError::Connection("locked".into()));
        assert_eq!(notice.to_string(), "position store unavailable: locked");
    }
}
