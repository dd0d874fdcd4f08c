//! REST client for the exam administration service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use testtrust_core::error::AppError;
use testtrust_core::result::AppResult;
use testtrust_core::traits::directory::ExamDirectory;
use testtrust_core::types::exam::{ExamSummary, StudentProfile};
use testtrust_core::types::id::{ExamId, StudentId};

/// Responses come either bare or wrapped as `{ "success": true, "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(value) => value,
        }
    }
}

/// Exam directory backed by the exam administration REST API.
#[derive(Debug, Clone)]
pub struct HttpExamDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExamDirectory {
    /// Create a client for `base_url` (e.g. `http://localhost:4000/api`).
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue a GET and decode the body; 404 maps to `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Exam directory request");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Exam directory unreachable");
            AppError::with_source(
                testtrust_core::error::ErrorKind::ExternalService,
                format!("Exam directory request failed: {e}"),
                e,
            )
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.json::<Envelope<T>>().await.map_err(|e| {
                    AppError::external_service(format!("Invalid exam directory response: {e}"))
                })?;
                Ok(Some(body.into_inner()))
            }
            status => Err(AppError::external_service(format!(
                "Exam directory returned {status} for {path}"
            ))),
        }
    }
}

#[async_trait]
impl ExamDirectory for HttpExamDirectory {
    async fn get_exam_by_id(&self, exam_id: &ExamId) -> AppResult<Option<ExamSummary>> {
        self.get_json(&format!("/exams/{exam_id}")).await
    }

    async fn get_student(&self, student_id: &StudentId) -> AppResult<Option<StudentProfile>> {
        self.get_json(&format!("/students/{student_id}")).await
    }

    async fn list_exam_students(&self, exam_id: &ExamId) -> AppResult<Vec<StudentProfile>> {
        Ok(self
            .get_json(&format!("/exams/{exam_id}/students"))
            .await?
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}
