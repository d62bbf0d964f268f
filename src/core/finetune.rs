//! Fine-tuning job submission.
//!
//! Two sequential calls: upload the JSONL dataset (purpose
//! `fine-tune`), then create a fine-tuning job referencing the returned
//! file id. The created job descriptor is the only reported result;
//! completion is not polled.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::core::retry::{retry, RetryPolicy};

#[derive(Debug, Error)]
pub enum FineTuneError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, FineTuneError>;

/// Descriptor of a created fine-tuning job.
#[derive(Debug, Clone, Deserialize)]
pub struct FineTuneJob {
    pub id: String,
    pub model: String,
    pub status: String,
    pub training_file: String,
}

/// Client for the fine-tuning service.
pub struct FineTuneClient {
    client: Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl FineTuneClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
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
            retry,
        }
    }

    /// Upload the dataset file and return the opaque file id.
    pub async fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "fine_tune_data.jsonl".to_string());

        retry(&self.retry, "dataset upload", || {
            self.upload_once(bytes.clone(), file_name.clone())
        })
        .await
    }

    async fn upload_once(&self, bytes: Vec<u8>, file_name: String) -> Result<String> {
        let form = Form::new()
            .text("purpose", "fine-tune")
            .part("file", Part::bytes(bytes).file_name(file_name));

        let resp = self
            .client
            .post(format!("{}/files", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let json = check_response(resp).await?;
        json["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| FineTuneError::InvalidResponse("missing file id".to_string()))
    }

    /// Create a fine-tuning job for an uploaded training file.
    pub async fn create_job(&self, training_file: &str, model: &str) -> Result<FineTuneJob> {
        retry(&self.retry, "fine-tune job creation", || {
            self.create_job_once(training_file, model)
        })
        .await
    }

    async fn create_job_once(&self, training_file: &str, model: &str) -> Result<FineTuneJob> {
        let body = serde_json::json!({
            "training_file": training_file,
            "model": model,
        });

        let resp = self
            .client
            .post(format!("{}/fine_tuning/jobs", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let json = check_response(resp).await?;
        serde_json::from_value(json)
            .map_err(|e| FineTuneError::InvalidResponse(format!("malformed job descriptor: {e}")))
    }
}

async fn check_response(resp: reqwest::Response) -> Result<serde_json::Value> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(FineTuneError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp.json().await?)
}
