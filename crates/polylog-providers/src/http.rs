//! HTTP review service evaluator.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use polylog_core::error::{EngineError, TransportError};
use polylog_core::model::Language;
use polylog_core::traits::{Evaluator, ReviewRequest};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Evaluator backed by a review service: `POST {base_url}/review`.
pub struct HttpEvaluator {
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpEvaluator {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout_secs,
            client,
        })
    }
}

#[derive(Serialize)]
struct ReviewBody<'a> {
    user_id: &'a str,
    module_code: &'a str,
    sentence: &'a str,
    input: &'a str,
    language: Language,
}

#[derive(Deserialize)]
struct ReviewResponse {
    #[serde(default)]
    feedback: Option<serde_json::Value>,
}

#[async_trait]
impl Evaluator for HttpEvaluator {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(module = %request.module_code, user = %request.user_id))]
    async fn review(&self, request: &ReviewRequest) -> Result<serde_json::Value, EngineError> {
        let body = ReviewBody {
            user_id: &request.user_id,
            module_code: request.module_code.as_str(),
            sentence: &request.sentence,
            input: &request.user_input,
            language: request.language,
        };

        let mut req = self
            .client
            .post(format!("{}/review", self.base_url))
            .header("content-type", "application/json");

        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout_secs)
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(TransportError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Authentication(body).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status,
                message: body,
            }
            .into());
        }

        let api_response: ReviewResponse = response.json().await.map_err(|e| {
            EngineError::Validation(format!("failed to parse review response: {e}"))
        })?;

        match api_response.feedback {
            // Some deployments return the feedback object serialized as text.
            Some(serde_json::Value::String(text)) => serde_json::from_str(&text)
                .map_err(|e| EngineError::Validation(format!("feedback is not JSON: {e}"))),
            Some(feedback) => Ok(feedback),
            None => Err(EngineError::Validation(
                "review response has no feedback".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ReviewRequest {
        ReviewRequest {
            user_id: "ana@example.com".into(),
            module_code: "200-201-1".into(),
            sentence: "나는 학생이다".into(),
            user_input: "I am a student".into(),
            language: Language::English,
        }
    }

    #[tokio::test]
    async fn successful_review() {
        let server = MockServer::start().await;

        let feedback = serde_json::json!({
            "문법": {"스코어": 90, "피드백": "좋아요"},
            "총점": {"스코어": 88, "피드백": "훌륭합니다"}
        });

        Mock::given(method("POST"))
            .and(path("/review"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_json(serde_json::json!({
                "user_id": "ana@example.com",
                "module_code": "200-201-1",
                "sentence": "나는 학생이다",
                "input": "I am a student",
                "language": "en"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "feedback": feedback })),
            )
            .mount(&server)
            .await;

        let evaluator = HttpEvaluator::new(&server.uri(), Some("test-key".into()), 5).unwrap();
        let value = evaluator.review(&request()).await.unwrap();
        assert_eq!(value, feedback);
    }

    #[tokio::test]
    async fn feedback_as_json_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/review"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "feedback": "{\"score\": 70, \"feedback\": \"ok\"}"
            })))
            .mount(&server)
            .await;

        let evaluator = HttpEvaluator::new(&format!("{}/", server.uri()), None, 5).unwrap();
        let value = evaluator.review(&request()).await.unwrap();
        assert_eq!(value["score"], 70);
    }

    #[tokio::test]
    async fn missing_feedback_is_a_validation_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/review"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let evaluator = HttpEvaluator::new(&server.uri(), None, 5).unwrap();
        let err = evaluator.review(&request()).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn error_status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/review"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let evaluator = HttpEvaluator::new(&server.uri(), None, 5).unwrap();
        let err = evaluator.review(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Transport(TransportError::Api { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn rate_limited_carries_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/review"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let evaluator = HttpEvaluator::new(&server.uri(), None, 5).unwrap();
        match evaluator.review(&request()).await.unwrap_err() {
            EngineError::Transport(t) => assert_eq!(t.retry_after_ms(), Some(3000)),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/review"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let evaluator = HttpEvaluator::new(&server.uri(), Some("wrong".into()), 5).unwrap();
        let err = evaluator.review(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Transport(TransportError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/review"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"feedback": {"score": 1}}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let evaluator = HttpEvaluator::new(&server.uri(), None, 1).unwrap();
        match evaluator.review(&request()).await.unwrap_err() {
            EngineError::Transport(t) => assert!(t.is_timeout(), "got {t:?}"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
