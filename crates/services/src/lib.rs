#![forbid(unsafe_code)]

pub mod api;
pub mod error;
pub mod sessions;

pub use exam_core::Clock;
pub use sessions as session;

pub use api::{
    ApiConfig, AttemptRecorder, AuthTokenProvider, Collaborators, HttpApi, ProgressAggregator,
    QuestionSource, StaticToken, StoredToken, SubjectSource,
};
pub use error::{ApiError, SessionError, SessionNotice, TelemetryError};
pub use sessions::{
    LaunchedSession, Navigation, SessionController, SessionOverview, SessionState,
    SubjectLauncher,
};
