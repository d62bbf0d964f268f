//! Research-question derivation via a chat-completion endpoint.
//!
//! One deterministic call per paper: the extracted intro goes into a
//! fixed two-slot prompt and the model is asked, at temperature 0, to
//! state the paper's main research question.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::core::retry::{retry, RetryPolicy};

/// The fixed question asked about every paper.
const RESEARCH_QUESTION_QUERY: &str = "What is the main research question discussed in the context? \
Formulate your response in a research question form.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// Client for deriving research questions from extracted intros.
pub struct QuestionDeriver {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl QuestionDeriver {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            retry,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Derive the research question for one paper's intro text.
    ///
    /// Retries transient failures per the configured policy; the last
    /// error is returned once the policy is exhausted.
    pub async fn derive(&self, context: &str) -> Result<String> {
        retry(&self.retry, "research question derivation", || {
            self.chat_once(context)
        })
        .await
    }

    async fn chat_once(&self, context: &str) -> Result<String> {
        // Single-pass fill of the two-slot template: context text is
        // never rescanned for slot markers.
        let prompt = format!(
            "Use the following pieces of context to answer the question at the end.\n\
             Do not give information not mentioned in the context information.\n\
             If you don't know the answer, just say that you don't know, \
             don't try to make up an answer.\n\
             Context: {context}\n\
             Question: {question}\n",
            context = context,
            question = RESEARCH_QUESTION_QUERY,
        );

        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = resp.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing message content".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn deriver(endpoint: &str) -> QuestionDeriver {
        QuestionDeriver::new(
            endpoint,
            "test-key",
            "gpt-4o",
            RetryPolicy::new(2, Duration::from_millis(1)),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_derive_sends_deterministic_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "temperature": 0.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "How does X affect Y?" } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let question = deriver(&server.uri())
            .derive("We study X.")
            .await
            .expect("derive question");
        assert_eq!(question, "How does X affect Y?");
    }

    #[tokio::test]
    async fn test_prompt_embeds_context_and_fixed_question() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [ { "message": { "content": "Q?" } } ]
            })))
            .mount(&server)
            .await;

        deriver(&server.uri())
            .derive("CONTEXT-SENTINEL")
            .await
            .expect("derive question");

        let requests = server.received_requests().await.expect("requests");
        let body: serde_json::Value =
            serde_json::from_slice(&requests[0].body).expect("request body");
        let content = body["messages"][0]["content"].as_str().expect("content");
        assert!(content.contains("CONTEXT-SENTINEL"));
        assert!(content.contains("main research question"));
    }

    #[tokio::test]
    async fn test_service_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = deriver(&server.uri())
            .derive("We study X.")
            .await
            .expect_err("should fail");
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [ { "message": { "content": "Recovered?" } } ]
            })))
            .mount(&server)
            .await;

        let question = deriver(&server.uri())
            .derive("We study X.")
            .await
            .expect("derive question");
        assert_eq!(question, "Recovered?");
    }

    #[tokio::test]
    async fn test_malformed_response_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let err = deriver(&server.uri())
            .derive("We study X.")
            .await
            .expect_err("should fail");
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
