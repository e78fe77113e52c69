//! Recording in-process backend for session tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use exam_core::model::{
    Answer, AnswerId, ContentType, Question, QuestionId, QuestionStatus, SchoolId, Subject,
    SubjectId,
};
use services::api::{
    AttemptRecorder, Collaborators, ProgressAggregator, QuestionSource, SubjectSource,
};
use services::ApiError;
use storage::{KeyValueStore, PositionStore, Storage, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Fetch(SubjectId),
    Subjects(SchoolId),
    Start(QuestionId),
    End(QuestionId),
    StartLearning(SubjectId),
    Update(SubjectId),
    Reset(SubjectId),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub fetch: bool,
    pub subjects: bool,
    pub start: bool,
    pub end: bool,
    pub start_learning: bool,
    pub update: bool,
    pub reset: bool,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    questions: Vec<Question>,
    subjects: Vec<Subject>,
    failures: Failures,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<Inner>>,
}

fn server_error() -> ApiError {
    ApiError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
}

impl FakeBackend {
    pub fn with_questions(questions: Vec<Question>) -> Self {
        let backend = Self::default();
        backend.inner.lock().unwrap().questions = questions;
        backend
    }

    pub fn set_subjects(&self, subjects: Vec<Subject>) {
        self.inner.lock().unwrap().subjects = subjects;
    }

    pub fn set_questions(&self, questions: Vec<Question>) {
        self.inner.lock().unwrap().questions = questions;
    }

    pub fn set_failures(&self, failures: Failures) {
        self.inner.lock().unwrap().failures = failures;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            questions: Arc::new(self.clone()),
            subjects: Arc::new(self.clone()),
            attempts: Arc::new(self.clone()),
            progress: Arc::new(self.clone()),
        }
    }

    fn record(&self, call: Call, fail: impl Fn(&Failures) -> bool) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if fail(&inner.failures) {
            Err(server_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QuestionSource for FakeBackend {
    async fn questions_for_subject(&self, subject_id: SubjectId) -> Result<Vec<Question>, ApiError> {
        self.record(Call::Fetch(subject_id), |f| f.fetch)?;
        Ok(self.inner.lock().unwrap().questions.clone())
    }
}

#[async_trait]
impl SubjectSource for FakeBackend {
    async fn subjects_for_school(&self, school_id: SchoolId) -> Result<Vec<Subject>, ApiError> {
        self.record(Call::Subjects(school_id), |f| f.subjects)?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .subjects
            .iter()
            .filter(|s| s.school_id() == school_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttemptRecorder for FakeBackend {
    async fn start(&self, question_id: QuestionId) -> Result<(), ApiError> {
        self.record(Call::Start(question_id), |f| f.start)
    }

    async fn end(&self, question_id: QuestionId) -> Result<(), ApiError> {
        self.record(Call::End(question_id), |f| f.end)
    }
}

#[async_trait]
impl ProgressAggregator for FakeBackend {
    async fn start_learning(&self, subject_id: SubjectId) -> Result<(), ApiError> {
        self.record(Call::StartLearning(subject_id), |f| f.start_learning)
    }

    async fn update_progress(&self, subject_id: SubjectId) -> Result<(), ApiError> {
        self.record(Call::Update(subject_id), |f| f.update)
    }

    async fn reset_progress(&self, subject_id: SubjectId) -> Result<(), ApiError> {
        self.record(Call::Reset(subject_id), |f| f.reset)?;
        let mut inner = self.inner.lock().unwrap();
        for subject in &mut inner.subjects {
            if subject.id() == subject_id {
                *subject = Subject::new(
                    subject.id(),
                    subject.school_id(),
                    subject.name(),
                    subject.question_count(),
                    0.0,
                )
                .unwrap();
            }
        }
        Ok(())
    }
}

/// Key/value store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Connection("disk unavailable".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk unavailable".into()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk unavailable".into()))
    }
}

pub const SUBJECT: SubjectId = SubjectId::new(1);
pub const SCHOOL: SchoolId = SchoolId::new(1);

pub fn question(id: u64) -> Question {
    Question {
        id: QuestionId::new(id),
        subject_id: SUBJECT,
        content: format!("Question {id}"),
        content_type: ContentType::Text,
        hint: None,
        answers: vec![
            Answer {
                id: AnswerId::new(id * 10),
                question_id: QuestionId::new(id),
                content: "right".into(),
                content_type: ContentType::Text,
                is_correct: true,
            },
            Answer {
                id: AnswerId::new(id * 10 + 1),
                question_id: QuestionId::new(id),
                content: "wrong".into(),
                content_type: ContentType::Text,
                is_correct: false,
            },
        ],
        status: None,
    }
}

pub fn completed_question(id: u64) -> Question {
    Question {
        status: Some(QuestionStatus::Completed),
        ..question(id)
    }
}

pub fn questions(n: u64) -> Vec<Question> {
    (1..=n).map(question).collect()
}

pub fn subject(progress: f64) -> Subject {
    Subject::new(SUBJECT, SCHOOL, "Math", 3, progress).unwrap()
}

pub fn q(id: u64) -> QuestionId {
    QuestionId::new(id)
}

pub fn memory_positions() -> (Arc<dyn KeyValueStore>, PositionStore) {
    let storage = Storage::in_memory();
    let positions = PositionStore::new(Arc::clone(&storage.kv));
    (storage.kv, positions)
}

pub async fn cached_index(kv: &Arc<dyn KeyValueStore>) -> Option<String> {
    kv.get("currentIndex_1").await.unwrap()
}

/// Every `start` is followed by exactly one `end` for the same question
/// before the next `start`.
pub fn assert_paired_attempts(calls: &[Call]) {
    let mut open: Option<QuestionId> = None;
    for call in calls {
        match call {
            Call::Start(id) => {
                assert!(open.is_none(), "start({id}) while {open:?} still open");
                open = Some(*id);
            }
            Call::End(id) => {
                assert_eq!(open, Some(*id), "end({id}) without matching start");
                open = None;
            }
            _ => {}
        }
    }
    assert!(open.is_none(), "attempt {open:?} never ended");
}
