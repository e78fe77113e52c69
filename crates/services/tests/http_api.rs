use std::sync::Arc;

use exam_core::model::{QuestionId, SchoolId, SubjectId};
use mockito::{Matcher, Server};
use serde_json::json;
use services::{
    ApiConfig, ApiError, AttemptRecorder, AuthTokenProvider, HttpApi, ProgressAggregator,
    QuestionSource, StaticToken, StoredToken, SubjectSource,
};
use storage::{InMemoryKeyValueStore, KeyValueStore};

fn api_with(server: &Server, auth: Arc<dyn AuthTokenProvider>) -> HttpApi {
    HttpApi::new(&ApiConfig::new(server.url()), auth).unwrap()
}

fn signed_in(server: &Server) -> HttpApi {
    api_with(server, Arc::new(StaticToken::new(Some("abc".into()))))
}

fn question_json(id: u64, status: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "subjectId": 7,
        "content": format!("Question {id}"),
        "contentType": "TEXT",
        "answers": [
            {
                "id": id * 10,
                "questionId": id,
                "content": "yes",
                "contentType": "TEXT",
                "isCorrect": true
            }
        ],
        "status": status,
    })
}

#[tokio::test]
async fn fetches_bare_question_list_with_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/questions/subject")
        .match_query(Matcher::UrlEncoded("subjectId".into(), "7".into()))
        .match_header("authorization", "Bearer abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([question_json(1, Some("completed")), question_json(2, None)]).to_string())
        .create_async()
        .await;

    let questions = signed_in(&server)
        .questions_for_subject(SubjectId::new(7))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(questions.len(), 2);
    assert!(questions[0].is_completed());
    assert!(!questions[1].is_completed());
    assert_eq!(questions[0].answers[0].question_id, QuestionId::new(1));
}

#[tokio::test]
async fn fetches_wrapped_subject_list() {
    let mut server = Server::new_async().await;
    let body = json!({
        "data": [
            {
                "id": 3,
                "schoolId": 1,
                "name": "Physics",
                "questionCount": 12,
                "userProgress": 100,
                "description": "ignored"
            }
        ]
    });
    let mock = server
        .mock("GET", "/subjects/school")
        .match_query(Matcher::UrlEncoded("schoolId".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let subjects = signed_in(&server)
        .subjects_for_school(SchoolId::new(1))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0].name(), "Physics");
    assert!(subjects[0].is_completed());
}

#[tokio::test]
async fn sends_attempt_and_progress_calls_to_their_routes() {
    let mut server = Server::new_async().await;
    let start = server
        .mock("POST", "/user/user-question-history/5/start")
        .with_status(200)
        .create_async()
        .await;
    let end = server
        .mock("POST", "/user/user-question-history/5/end")
        .with_status(200)
        .create_async()
        .await;
    let learning = server
        .mock("POST", "/user-progress/7/start")
        .with_status(201)
        .create_async()
        .await;
    let update = server
        .mock("PATCH", "/user-progress/7/update")
        .with_status(200)
        .create_async()
        .await;
    let reset = server
        .mock("DELETE", "/user-progress/7/reset")
        .with_status(204)
        .create_async()
        .await;

    let api = signed_in(&server);
    api.start(QuestionId::new(5)).await.unwrap();
    api.end(QuestionId::new(5)).await.unwrap();
    api.start_learning(SubjectId::new(7)).await.unwrap();
    api.update_progress(SubjectId::new(7)).await.unwrap();
    api.reset_progress(SubjectId::new(7)).await.unwrap();

    start.assert_async().await;
    end.assert_async().await;
    learning.assert_async().await;
    update.assert_async().await;
    reset.assert_async().await;
}

#[tokio::test]
async fn base_path_prefix_is_kept() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PATCH", "/api/user-progress/2/update")
        .with_status(200)
        .create_async()
        .await;

    let config = ApiConfig::new(format!("{}/api", server.url()));
    let api = HttpApi::new(&config, Arc::new(StaticToken::default())).unwrap();
    api.update_progress(SubjectId::new(2)).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn unauthorized_clears_stored_token() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/user/user-question-history/1/start")
        .with_status(401)
        .create_async()
        .await;

    let kv = InMemoryKeyValueStore::new();
    let token = StoredToken::new(Arc::new(kv.clone()));
    token.save("expired").await.unwrap();
    let api = api_with(&server, Arc::new(token));

    let err = api.start(QuestionId::new(1)).await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(kv.get("token").await.unwrap(), None);
}

#[tokio::test]
async fn server_errors_surface_status() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/questions/subject")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let err = signed_in(&server)
        .questions_for_subject(SubjectId::new(1))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status(status) if status.as_u16() == 503));
}

#[tokio::test]
async fn requests_without_token_omit_authorization() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/subjects/school")
        .match_query(Matcher::Any)
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let api = api_with(&server, Arc::new(StaticToken::new(Some("   ".into()))));
    let subjects = api.subjects_for_school(SchoolId::new(9)).await.unwrap();

    mock.assert_async().await;
    assert!(subjects.is_empty());
}

#[tokio::test]
async fn out_of_range_progress_does_not_lose_the_catalog() {
    let mut server = Server::new_async().await;
    let body = json!([
        {"id": 1, "schoolId": 1, "name": "Math", "userProgress": 40},
        {"id": 2, "schoolId": 1, "name": "Physics", "userProgress": 100.5}
    ]);
    server
        .mock("GET", "/subjects/school")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let subjects = signed_in(&server)
        .subjects_for_school(SchoolId::new(1))
        .await
        .unwrap();

    assert_eq!(subjects.len(), 2);
    assert!(!subjects[0].is_completed());
    assert!(subjects[1].is_completed());
    assert!((subjects[1].user_progress() - 100.0).abs() < f64::EPSILON);
}
