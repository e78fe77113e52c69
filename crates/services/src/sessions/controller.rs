use std::fmt;
use std::sync::Arc;

use exam_core::Clock;
use exam_core::model::{
    AnswerId, Question, QuestionHistoryEntry, QuestionId, SessionPosition, SubjectId,
};
use storage::PositionStore;

use super::progress::{SessionOverview, percent_of};
use super::state::{Navigation, SessionState};
use crate::api::{AttemptRecorder, Collaborators, ProgressAggregator, QuestionSource};
use crate::error::{SessionError, SessionNotice, TelemetryError};

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives a learner through one subject's ordered questions.
///
/// Exactly one attempt is open while the session is `Active`: every index
/// change closes the current attempt (`end`) before opening the next one
/// (`start`). Transitions take `&mut self`, so calls for one question are
/// never issued concurrently or out of order.
///
/// Telemetry and local storage failures never fail a transition; they are
/// logged and queued as [`SessionNotice`]s.
///
/// Call [`SessionController::close`] when leaving the subject. If the
/// controller is dropped with an attempt still open, `end` is sent from a
/// detached task on the current Tokio runtime.
pub struct SessionController {
    subject_id: SubjectId,
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    attempts: Arc<dyn AttemptRecorder>,
    progress: Arc<dyn ProgressAggregator>,
    positions: PositionStore,
    fresh_start: bool,
    state: SessionState,
    questions: Vec<Question>,
    open_attempt: Option<QuestionId>,
    selected_answer: Option<AnswerId>,
    history: Vec<QuestionHistoryEntry>,
    notices: Vec<SessionNotice>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        subject_id: SubjectId,
        collaborators: &Collaborators,
        positions: PositionStore,
        clock: Clock,
    ) -> Self {
        Self {
            subject_id,
            clock,
            source: Arc::clone(&collaborators.questions),
            attempts: Arc::clone(&collaborators.attempts),
            progress: Arc::clone(&collaborators.progress),
            positions,
            fresh_start: false,
            state: SessionState::Idle,
            questions: Vec::new(),
            open_attempt: None,
            selected_answer: None,
            history: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Ignore any cached position on load and begin at the first question.
    #[must_use]
    pub fn with_fresh_start(mut self) -> Self {
        self.fresh_start = true;
        self
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.state.active_index()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<AnswerId> {
        self.selected_answer
    }

    /// Attempts recorded during this visit, oldest first.
    #[must_use]
    pub fn history(&self) -> &[QuestionHistoryEntry] {
        &self.history
    }

    /// Drain queued non-fatal problems.
    pub fn take_notices(&mut self) -> Vec<SessionNotice> {
        std::mem::take(&mut self.notices)
    }

    #[must_use]
    pub fn overview(&self) -> SessionOverview {
        let total = self.questions.len();
        let completed = self.questions.iter().filter(|q| q.is_completed()).count();
        let current_index = self.current_index();
        let (can_prev, can_next, can_finish) = match current_index {
            Some(i) => {
                let at = SessionPosition::new(self.subject_id, i);
                (!at.is_first(), !at.is_last(total), at.is_last(total))
            }
            None => (false, false, false),
        };
        SessionOverview {
            total,
            completed,
            percent: percent_of(completed, total),
            current_index,
            can_prev,
            can_next,
            can_finish,
        }
    }

    /// Fetch the question list and open the first attempt.
    ///
    /// The cached position is read before the fetch and clamped once the
    /// list is known. An empty list ends in `Empty` without any `start`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Fetch` if the list is unavailable (the session
    /// moves to `Failed` and `load` may be retried), or
    /// `SessionError::InvalidTransition` if already loaded.
    pub async fn load(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Idle | SessionState::Failed) {
            return Err(self.invalid("load"));
        }

        let cached = if self.fresh_start {
            None
        } else {
            self.read_position().await
        };
        self.state = SessionState::Loading;

        match self.source.questions_for_subject(self.subject_id).await {
            Ok(questions) => self.questions = questions,
            Err(err) => {
                tracing::warn!(subject_id = %self.subject_id, error = %err, "question list unavailable");
                self.state = SessionState::Failed;
                return Err(SessionError::Fetch(err));
            }
        }

        let provisional = cached.unwrap_or_else(|| SessionPosition::start(self.subject_id));
        let Some(position) = provisional.clamped(self.questions.len()) else {
            tracing::info!(subject_id = %self.subject_id, "subject has no questions");
            self.state = SessionState::Empty;
            return Ok(());
        };

        self.fresh_start = false;
        self.write_position(position).await;
        self.activate(position.current_index()).await;
        tracing::info!(
            subject_id = %self.subject_id,
            index = position.current_index(),
            total = self.questions.len(),
            "session loaded"
        );
        Ok(())
    }

    /// Complete the current question and move to the next one.
    ///
    /// Sequence: `end(current)`, `update_progress(subject)`, re-fetch the
    /// question list, advance (clamped), persist, `start(new current)`.
    /// At the last index this is a no-op; use [`SessionController::finish`].
    /// If the re-fetched list shrank so the clamped target is the current
    /// index, the same question is restarted and `Unchanged` is returned.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is active.
    pub async fn next(&mut self) -> Result<Navigation, SessionError> {
        let index = self.require_active("next")?;
        if SessionPosition::new(self.subject_id, index).is_last(self.questions.len()) {
            return Ok(Navigation::Unchanged);
        }

        self.state = SessionState::Advancing { from: index };
        self.end_attempt().await;
        self.update_progress().await;
        self.refetch().await;

        let Some(target) =
            SessionPosition::new(self.subject_id, index).advanced(self.questions.len())
        else {
            tracing::info!(subject_id = %self.subject_id, "question list emptied on refetch");
            self.state = SessionState::Empty;
            return Ok(Navigation::Unchanged);
        };

        self.write_position(target).await;
        self.activate(target.current_index()).await;
        if target.current_index() == index {
            return Ok(Navigation::Unchanged);
        }
        Ok(Navigation::Moved {
            from: index,
            to: target.current_index(),
        })
    }

    /// Go back one question. Revisiting does not advance completion, so no
    /// progress update is sent.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is active.
    pub async fn prev(&mut self) -> Result<Navigation, SessionError> {
        let index = self.require_active("prev")?;
        let position = SessionPosition::new(self.subject_id, index);
        if position.is_first() {
            return Ok(Navigation::Unchanged);
        }
        Ok(self.move_to(index, position.retreated()).await)
    }

    /// Jump to any question, as from the progress sidebar. Clamped to the
    /// list; selecting the current question is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is active.
    pub async fn select(&mut self, index: usize) -> Result<Navigation, SessionError> {
        let current = self.require_active("select")?;
        let Some(target) =
            SessionPosition::new(self.subject_id, index).clamped(self.questions.len())
        else {
            return Ok(Navigation::Unchanged);
        };
        if target.current_index() == current {
            return Ok(Navigation::Unchanged);
        }
        Ok(self.move_to(current, target).await)
    }

    /// Close the current question, count it toward progress, and end the
    /// session without moving the index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is active.
    pub async fn finish(&mut self) -> Result<(), SessionError> {
        let index = self.require_active("finish")?;
        self.state = SessionState::Advancing { from: index };
        self.end_attempt().await;
        self.update_progress().await;
        self.state = SessionState::Finished { index };
        tracing::info!(subject_id = %self.subject_id, index, "session finished");
        Ok(())
    }

    /// Record an answer choice for the current question.
    ///
    /// Returns whether the choice is correct. The latest choice wins.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is active
    /// and `SessionError::UnknownAnswer` if the answer is not an option of the
    /// current question.
    pub fn choose_answer(&mut self, answer_id: AnswerId) -> Result<bool, SessionError> {
        let index = self.require_active("choose an answer")?;
        let question = self
            .questions
            .get(index)
            .ok_or_else(|| self.invalid("choose an answer"))?;
        let is_correct = question
            .answer(answer_id)
            .map(|answer| answer.is_correct)
            .ok_or(SessionError::UnknownAnswer {
                question_id: question.id,
                answer_id,
            })?;

        self.selected_answer = Some(answer_id);
        if let Some(entry) = self.history.last_mut().filter(|entry| entry.is_open()) {
            entry.record_answer(is_correct);
        }
        Ok(is_correct)
    }

    /// Session close: send `end` for the open attempt, if any.
    ///
    /// Safe to call in any state and more than once.
    pub async fn close(&mut self) {
        self.end_attempt().await;
        self.state = SessionState::Closed;
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    fn require_active(&self, action: &'static str) -> Result<usize, SessionError> {
        self.state.active_index().ok_or_else(|| self.invalid(action))
    }

    async fn move_to(&mut self, from: usize, target: SessionPosition) -> Navigation {
        self.state = SessionState::Advancing { from };
        self.end_attempt().await;
        self.write_position(target).await;
        self.activate(target.current_index()).await;
        Navigation::Moved {
            from,
            to: target.current_index(),
        }
    }

    async fn activate(&mut self, index: usize) {
        let Some(question_id) = self.questions.get(index).map(|q| q.id) else {
            self.state = SessionState::Empty;
            return;
        };
        self.state = SessionState::Active { index };
        self.selected_answer = None;
        self.open_attempt = Some(question_id);
        self.history
            .push(QuestionHistoryEntry::open(question_id, self.clock.now()));

        tracing::debug!(subject_id = %self.subject_id, %question_id, index, "attempt started");
        if let Err(source) = self.attempts.start(question_id).await {
            self.report(TelemetryError::Start {
                question_id,
                source,
            });
        }
    }

    async fn end_attempt(&mut self) {
        let Some(question_id) = self.open_attempt.take() else {
            return;
        };
        let ended_at = self.clock.now();
        if let Some(entry) = self
            .history
            .iter_mut()
            .rev()
            .find(|entry| entry.question_id() == question_id && entry.is_open())
        {
            if let Err(err) = entry.close(ended_at) {
                tracing::warn!(%question_id, error = %err, "could not close local attempt record");
            }
        }

        tracing::debug!(subject_id = %self.subject_id, %question_id, "attempt ended");
        if let Err(source) = self.attempts.end(question_id).await {
            self.report(TelemetryError::End {
                question_id,
                source,
            });
        }
    }

    async fn update_progress(&mut self) {
        if let Err(source) = self.progress.update_progress(self.subject_id).await {
            self.report(TelemetryError::UpdateProgress {
                subject_id: self.subject_id,
                source,
            });
        }
    }

    // Completion flags are only trusted once re-validated by the server.
    async fn refetch(&mut self) {
        match self.source.questions_for_subject(self.subject_id).await {
            Ok(questions) => self.questions = questions,
            Err(err) => {
                tracing::warn!(subject_id = %self.subject_id, error = %err, "keeping previous question list");
                self.notices.push(SessionNotice::StaleQuestions(err));
            }
        }
    }

    async fn read_position(&mut self) -> Option<SessionPosition> {
        match self.positions.get(self.subject_id).await {
            Ok(position) => position,
            Err(err) => {
                tracing::warn!(subject_id = %self.subject_id, error = %err, "could not read cached position");
                self.notices.push(SessionNotice::PositionStore(err));
                None
            }
        }
    }

    async fn write_position(&mut self, position: SessionPosition) {
        if let Err(err) = self.positions.set(position).await {
            tracing::warn!(subject_id = %self.subject_id, error = %err, "could not persist position");
            self.notices.push(SessionNotice::PositionStore(err));
        }
    }

    fn report(&mut self, err: TelemetryError) {
        tracing::warn!(error = %err, cause = %source_of(&err), "telemetry call failed");
        self.notices.push(SessionNotice::Telemetry(err));
    }

    pub(crate) fn push_notice(&mut self, notice: SessionNotice) {
        self.notices.push(notice);
    }
}

fn source_of(err: &TelemetryError) -> String {
    std::error::Error::source(err).map_or_else(String::new, ToString::to_string)
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let Some(question_id) = self.open_attempt.take() else {
            return;
        };
        let attempts = Arc::clone(&self.attempts);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = attempts.end(question_id).await {
                        tracing::debug!(%question_id, error = %err, "background end failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(%question_id, "session dropped outside a runtime; attempt left open");
            }
        }
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("subject_id", &self.subject_id)
            .field("state", &self.state)
            .field("questions_len", &self.questions.len())
            .field("open_attempt", &self.open_attempt)
            .field("history_len", &self.history.len())
            .field("notices_len", &self.notices.len())
            .finish_non_exhaustive()
    }
}
