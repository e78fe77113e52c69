use serde::{Deserialize, Serialize};

use crate::model::ids::{AnswerId, QuestionId, SubjectId};

/// How a question or answer body should be interpreted by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    Text,
    Image,
    Latex,
    Video,
}

/// Per-question status flag the server attaches to the question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Completed,
    #[serde(other)]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub content: String,
    pub content_type: ContentType,
    pub is_correct: bool,
}

/// A question in a subject's ordered set. Position in the fetched list is its
/// index in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub subject_id: SubjectId,
    pub content: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QuestionStatus>,
}

impl Question {
    #[must_use]
    pub fn answer(&self, id: AnswerId) -> Option<&Answer> {
        self.answers.iter().find(|answer| answer.id == id)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == Some(QuestionStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "id": 11,
        "subjectId": 4,
        "content": "x^2 = 4",
        "contentType": "LATEX",
        "hint": null,
        "answers": [
            {"id": 1, "questionId": 11, "content": "2", "contentType": "TEXT", "isCorrect": true},
            {"id": 2, "questionId": 11, "content": "3", "contentType": "TEXT", "isCorrect": false}
        ],
        "status": "completed"
    }"#;

    #[test]
    fn decodes_server_payload() {
        let question: Question = serde_json::from_str(PAYLOAD).unwrap();
        assert_eq!(question.id, QuestionId::new(11));
        assert_eq!(question.content_type, ContentType::Latex);
        assert_eq!(question.hint, None);
        assert!(question.is_completed());
        assert!(question.answer(AnswerId::new(1)).unwrap().is_correct);
        assert!(question.answer(AnswerId::new(9)).is_none());
    }

    #[test]
    fn unknown_status_is_pending() {
        let json = r#"{"id": 1, "subjectId": 1, "content": "q", "contentType": "TEXT", "status": "in_progress"}"#;
        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.status, Some(QuestionStatus::Pending));
        assert!(!question.is_completed());
        assert!(question.answers.is_empty());
    }
}
