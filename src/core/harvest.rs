//! Reference metadata harvesting from an academic graph service.
//!
//! Standalone batch job: for each source paper (file stem = corpus id)
//! it resolves the paper, walks its reference list, fetches title,
//! abstract, authors and publication date per reference, and writes the
//! abstract-non-null subset to the CSV side-file the pipeline's
//! metadata loader consumes. A fixed inter-request delay is the rate
//! gate for the service.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::core::pipeline::list_papers;
use crate::core::retry::{retry, RetryPolicy};

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("failed to scan input directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("failed to write side-file: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;

/// One side-file row. Field order and names define the CSV header the
/// metadata loader expects.
#[derive(Debug, Serialize)]
struct HarvestedReference {
    #[serde(rename = "publicationYear")]
    publication_year: Option<String>,
    authors: String,
    title: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
}

/// Outcome of a harvest run over one directory of papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestSummary {
    pub papers: usize,
    pub skipped: usize,
}

pub struct Harvester {
    client: Client,
    endpoint: String,
    delay: Duration,
    retry: RetryPolicy,
}

impl Harvester {
    pub fn new(endpoint: impl Into<String>, delay: Duration, retry: RetryPolicy) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            endpoint: endpoint.into(),
            delay,
            retry,
        }
    }

    /// Harvest side-files for every `*.pdf` in `dir`. Per-paper
    /// failures are logged and skip that paper only.
    pub async fn run(&self, dir: &Path) -> Result<HarvestSummary> {
        let papers = list_papers(dir)?;
        log::info!("harvesting metadata for {} papers", papers.len());

        let mut written = 0;
        let mut skipped = 0;
        for path in &papers {
            let corpus_id = match path.file_stem() {
                Some(stem) => stem.to_string_lossy().to_string(),
                None => {
                    skipped += 1;
                    continue;
                }
            };
            match self.harvest_paper(&corpus_id).await {
                Ok(rows) => {
                    let side_file = path.with_extension("csv");
                    write_side_file(&side_file, &rows)?;
                    log::info!(
                        "{corpus_id}: wrote {} references to {}",
                        rows.len(),
                        side_file.display()
                    );
                    written += 1;
                }
                Err(e) => {
                    log::warn!("{corpus_id}: harvest failed: {e}, skipping");
                    skipped += 1;
                }
            }
        }

        Ok(HarvestSummary {
            papers: written,
            skipped,
        })
    }

    /// Fetch the cleaned reference rows for one corpus id.
    async fn harvest_paper(&self, corpus_id: &str) -> Result<Vec<HarvestedReference>> {
        let paper_id = self.resolve_paper_id(corpus_id).await?;
        let reference_ids = self.fetch_reference_ids(&paper_id).await?;
        log::info!("{corpus_id}: {} references", reference_ids.len());

        let mut rows = Vec::new();
        for (index, reference_id) in reference_ids.iter().enumerate() {
            match self.fetch_reference(reference_id).await {
                Ok(Some(row)) => rows.push(row),
                // Null abstract: row dropped by design.
                Ok(None) => {}
                Err(e) => {
                    log::warn!("{corpus_id}: reference {reference_id} failed: {e}, skipping");
                }
            }
            log::debug!(
                "{corpus_id}: processed reference {} of {}",
                index + 1,
                reference_ids.len()
            );
            tokio::time::sleep(self.delay).await;
        }

        Ok(rows)
    }

    /// Resolve a corpus id to the service's primary paper id.
    async fn resolve_paper_id(&self, corpus_id: &str) -> Result<String> {
        let url = format!("{}/paper/CorpusId:{corpus_id}?fields=paperId", self.endpoint);
        let json = retry(&self.retry, "paper lookup", || self.get_json(url.clone())).await?;
        json["paperId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| HarvestError::InvalidResponse("missing paperId".to_string()))
    }

    /// Fetch the ids of all papers this paper cites.
    async fn fetch_reference_ids(&self, paper_id: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/paper/{paper_id}/references?fields=paperId&limit=1000",
            self.endpoint
        );
        let json = retry(&self.retry, "reference list", || self.get_json(url.clone())).await?;
        let data = json["data"]
            .as_array()
            .ok_or_else(|| HarvestError::InvalidResponse("missing reference data".to_string()))?;

        Ok(data
            .iter()
            .filter_map(|entry| entry["citedPaper"]["paperId"].as_str())
            .map(str::to_string)
            .collect())
    }

    /// Fetch one reference's metadata. Returns `None` when the service
    /// has no abstract for it.
    async fn fetch_reference(&self, paper_id: &str) -> Result<Option<HarvestedReference>> {
        let url = format!(
            "{}/paper/{paper_id}?fields=title,abstract,authors,publicationDate",
            self.endpoint
        );
        let json = retry(&self.retry, "reference metadata", || self.get_json(url.clone())).await?;

        let abstract_text = match json["abstract"].as_str() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => return Ok(None),
        };

        let publication_year = json["publicationDate"]
            .as_str()
            .and_then(|date| date.split('-').next())
            .map(str::to_string);

        let author_names: Vec<&str> = json["authors"]
            .as_array()
            .map(|authors| {
                authors
                    .iter()
                    .filter_map(|author| author["name"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(HarvestedReference {
            publication_year,
            // Bracketed list form, matching the side-file contract the
            // metadata loader normalizes away.
            authors: format!("[{}]", author_names.join(", ")),
            title: json["title"].as_str().unwrap_or_default().to_string(),
            abstract_text,
        }))
    }

    async fn get_json(&self, url: String) -> Result<serde_json::Value> {
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(HarvestError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }
}

fn write_side_file(path: &Path, rows: &[HarvestedReference]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
