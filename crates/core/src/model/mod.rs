mod history;
mod ids;
mod position;
mod question;
mod subject;

pub use history::{HistoryError, QuestionHistoryEntry};
pub use ids::{AnswerId, ParseIdError, QuestionId, SchoolId, SubjectId};
pub use position::SessionPosition;
pub use question::{Answer, ContentType, Question, QuestionStatus};
pub use subject::{COMPLETE_PERCENT, Subject, SubjectError};
