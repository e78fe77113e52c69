use std::sync::Arc;

use async_trait::async_trait;
use exam_core::model::{Question, QuestionId, SchoolId, Subject, SubjectId};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{
    ApiConfig, AttemptRecorder, AuthTokenProvider, ProgressAggregator, QuestionSource,
    SubjectSource,
};
use crate::error::ApiError;

/// `reqwest` client for the learning platform's REST API.
///
/// Attaches the bearer token to every request, and clears it when the server
/// answers 401.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    auth: Arc<dyn AuthTokenProvider>,
}

impl HttpApi {
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if the configured URL does not parse
    /// and `ApiError::Http` if the client cannot be built.
    pub fn new(config: &ApiConfig, auth: Arc<dyn AuthTokenProvider>) -> Result<Self, ApiError> {
        // A trailing slash keeps `Url::join` from dropping the last segment.
        let mut raw = config.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url =
            Url::parse(&raw).map_err(|_| ApiError::InvalidBaseUrl(config.base_url.clone()))?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, ApiError> {
        let url = self.url(path, query)?;
        tracing::debug!(%method, %url, "api request");

        let with_body = method == Method::POST || method == Method::PATCH;
        let mut request = self.client.request(method, url);
        if let Some(token) = self.auth.bearer_token().await {
            request = request.bearer_auth(token);
        }
        if with_body {
            request = request.json(&serde_json::json!({}));
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("api rejected credentials; clearing token");
            self.auth.clear_token().await;
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(response)
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let body: ListEnvelope<T> = self.send(Method::GET, path, query).await?.json().await?;
        Ok(body.into_items())
    }
}

/// Lists arrive either bare or wrapped in `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items) | ListEnvelope::Wrapped { data: items } => items,
        }
    }
}

#[async_trait]
impl QuestionSource for HttpApi {
    async fn questions_for_subject(&self, subject_id: SubjectId) -> Result<Vec<Question>, ApiError> {
        self.fetch_list(
            "questions/subject",
            &[("subjectId", subject_id.to_string())],
        )
        .await
    }
}

#[async_trait]
impl SubjectSource for HttpApi {
    async fn subjects_for_school(&self, school_id: SchoolId) -> Result<Vec<Subject>, ApiError> {
        self.fetch_list("subjects/school", &[("schoolId", school_id.to_string())])
            .await
    }
}

#[async_trait]
impl AttemptRecorder for HttpApi {
    async fn start(&self, question_id: QuestionId) -> Result<(), ApiError> {
        let path = format!("user/user-question-history/{question_id}/start");
        self.send(Method::POST, &path, &[]).await?;
        Ok(())
    }

    async fn end(&self, question_id: QuestionId) -> Result<(), ApiError> {
        let path = format!("user/user-question-history/{question_id}/end");
        self.send(Method::POST, &path, &[]).await?;
        Ok(())
    }
}

#[async_trait]
impl ProgressAggregator for HttpApi {
    async fn start_learning(&self, subject_id: SubjectId) -> Result<(), ApiError> {
        let path = format!("user-progress/{subject_id}/start");
        self.send(Method::POST, &path, &[]).await?;
        Ok(())
    }

    async fn update_progress(&self, subject_id: SubjectId) -> Result<(), ApiError> {
        let path = format!("user-progress/{subject_id}/update");
        self.send(Method::PATCH, &path, &[]).await?;
        Ok(())
    }

    async fn reset_progress(&self, subject_id: SubjectId) -> Result<(), ApiError> {
        let path = format!("user-progress/{subject_id}/reset");
        self.send(Method::DELETE, &path, &[]).await?;
        Ok(())
    }
}
