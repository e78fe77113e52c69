//! REST collaborators of the session engine.
//!
//! Each concern is a trait so the controller can be driven by the real
//! `HttpApi` or by in-process fakes.

mod auth;
mod client;
mod config;

use std::sync::Arc;

use async_trait::async_trait;
use exam_core::model::{Question, QuestionId, SchoolId, Subject, SubjectId};

use crate::error::ApiError;

pub use auth::{AuthTokenProvider, StaticToken, StoredToken, TOKEN_KEY};
pub use client::HttpApi;
pub use config::ApiConfig;

/// Question Set Provider.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Ordered questions for a subject; array index is session position.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network or decoding failure.
    async fn questions_for_subject(&self, subject_id: SubjectId) -> Result<Vec<Question>, ApiError>;
}

/// Subject catalog for a school.
#[async_trait]
pub trait SubjectSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` on network or decoding failure.
    async fn subjects_for_school(&self, school_id: SchoolId) -> Result<Vec<Subject>, ApiError>;
}

/// Attempt Recorder: start/end lifecycle events for a question.
#[async_trait]
pub trait AttemptRecorder: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` if the server did not record the start.
    async fn start(&self, question_id: QuestionId) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the server did not record the end.
    async fn end(&self, question_id: QuestionId) -> Result<(), ApiError>;
}

/// Progress Aggregator. The server owns the percentage; these calls only
/// ask it to recompute.
#[async_trait]
pub trait ProgressAggregator: Send + Sync {
    /// Initialize a progress record when a subject is entered.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    async fn start_learning(&self, subject_id: SubjectId) -> Result<(), ApiError>;

    /// One more question of the subject has been completed.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    async fn update_progress(&self, subject_id: SubjectId) -> Result<(), ApiError>;

    /// Zero the subject's progress.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    async fn reset_progress(&self, subject_id: SubjectId) -> Result<(), ApiError>;
}

/// The collaborators a session needs, behind trait objects.
#[derive(Clone)]
pub struct Collaborators {
    pub questions: Arc<dyn QuestionSource>,
    pub subjects: Arc<dyn SubjectSource>,
    pub attempts: Arc<dyn AttemptRecorder>,
    pub progress: Arc<dyn ProgressAggregator>,
}

impl Collaborators {
    /// Route every concern through one HTTP client.
    #[must_use]
    pub fn http(api: HttpApi) -> Self {
        let api = Arc::new(api);
        Self {
            questions: Arc::clone(&api) as Arc<dyn QuestionSource>,
            subjects: Arc::clone(&api) as Arc<dyn SubjectSource>,
            attempts: Arc::clone(&api) as Arc<dyn AttemptRecorder>,
            progress: api,
        }
    }
}
