use exam_core::Clock;
use exam_core::model::{SchoolId, Subject, SubjectId};
use storage::PositionStore;

use super::controller::SessionController;
use crate::api::Collaborators;
use crate::error::{SessionError, SessionNotice, TelemetryError};

/// A subject entered and ready to study.
#[derive(Debug)]
pub struct LaunchedSession {
    /// The subject as the server reports it after entering.
    pub subject: Subject,
    /// True when a completed subject was reset and restarted from the top.
    pub restarted: bool,
    pub controller: SessionController,
}

/// Decides between resuming and restarting when a learner enters a subject.
#[derive(Clone)]
pub struct SubjectLauncher {
    clock: Clock,
    collaborators: Collaborators,
    positions: PositionStore,
}

impl SubjectLauncher {
    #[must_use]
    pub fn new(clock: Clock, collaborators: Collaborators, positions: PositionStore) -> Self {
        Self {
            clock,
            collaborators,
            positions,
        }
    }

    /// List a school's subjects with the learner's current progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Subjects` if the catalog is unavailable.
    pub async fn subjects(&self, school_id: SchoolId) -> Result<Vec<Subject>, SessionError> {
        self.collaborators
            .subjects
            .subjects_for_school(school_id)
            .await
            .map_err(SessionError::Subjects)
    }

    /// Enter a subject ("start" / "continue").
    ///
    /// A subject at 100% is reset on the server and its cached position is
    /// cleared *before* subjects are re-fetched and the session starts, so
    /// the learner begins at the first question. Any other subject resumes
    /// at the cached position, clamped to the question list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidSubject` for a zero id,
    /// `SessionError::Reset` if the reset fails (nothing else is attempted),
    /// and `SessionError::Fetch` if the question list cannot be loaded.
    pub async fn enter(&self, subject: &Subject) -> Result<LaunchedSession, SessionError> {
        let subject_id = subject.id();
        if subject_id.value() == 0 {
            return Err(SessionError::InvalidSubject(subject_id));
        }

        let mut notices = Vec::new();
        let restarted = subject.is_completed();
        let mut current = subject.clone();

        if restarted {
            tracing::info!(%subject_id, "subject completed; resetting progress");
            self.collaborators
                .progress
                .reset_progress(subject_id)
                .await
                .map_err(|err| {
                    tracing::warn!(%subject_id, error = %err, "progress reset failed");
                    SessionError::Reset(err)
                })?;
            current = current.with_progress_cleared();

            if let Err(err) = self.positions.clear(subject_id).await {
                tracing::warn!(%subject_id, error = %err, "could not clear cached position");
                notices.push(SessionNotice::PositionStore(err));
            }

            match self.refresh(&current).await {
                Ok(Some(refreshed)) => current = refreshed,
                Ok(None) => {
                    tracing::warn!(%subject_id, "subject missing from refreshed catalog");
                }
                Err(err) => {
                    tracing::warn!(%subject_id, error = %err, "could not refresh subjects");
                    notices.push(SessionNotice::StaleSubjects(err));
                }
            }
        }

        if let Err(source) = self.collaborators.progress.start_learning(subject_id).await {
            let err = TelemetryError::StartLearning { subject_id, source };
            tracing::warn!(error = %err, "telemetry call failed");
            notices.push(SessionNotice::Telemetry(err));
        }

        let mut controller = self.controller(subject_id);
        if restarted {
            controller = controller.with_fresh_start();
        }
        for notice in notices {
            controller.push_notice(notice);
        }
        controller.load().await?;

        Ok(LaunchedSession {
            subject: current,
            restarted,
            controller,
        })
    }

    /// A controller for `subject_id` that has not been loaded yet.
    #[must_use]
    pub fn controller(&self, subject_id: SubjectId) -> SessionController {
        SessionController::new(
            subject_id,
            &self.collaborators,
            self.positions.clone(),
            self.clock,
        )
    }

    async fn refresh(&self, subject: &Subject) -> Result<Option<Subject>, crate::error::ApiError> {
        let subjects = self
            .collaborators
            .subjects
            .subjects_for_school(subject.school_id())
            .await?;
        Ok(subjects.into_iter().find(|s| s.id() == subject.id()))
    }
}
