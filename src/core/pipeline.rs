//! Dataset preparation pipeline.
//!
//! Processes each source paper to completion before the next: extract
//! the intro, load the reference metadata side-file, derive the
//! research question, assemble the training record. Per-document
//! failures are logged and skip that document only; the dataset is
//! written once at the end and only that final write can fail the run.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::PipelineConfig;
use crate::core::dataset::{build_example, Dataset, DatasetError, FineTuneExample};
use crate::core::extract::extract_intro;
use crate::core::metadata::load_metadata;
use crate::core::question::QuestionDeriver;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to scan input directory: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Outcome of a pipeline run. `skipped` counts papers excluded by
/// per-document failures; callers should surface partial failure with a
/// non-zero exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub examples: usize,
    pub skipped: usize,
}

pub struct Pipeline {
    config: PipelineConfig,
    deriver: QuestionDeriver,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, deriver: QuestionDeriver) -> Self {
        Self { config, deriver }
    }

    /// Run the pipeline over every `*.pdf` in the input directory and
    /// write the dataset to the configured output file.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let papers = list_papers(&self.config.input_dir)?;
        log::info!(
            "found {} papers in {}",
            papers.len(),
            self.config.input_dir.display()
        );

        let mut dataset = Dataset::new();
        let mut skipped = 0;
        for path in &papers {
            match self.process_paper(path).await {
                Some(example) => dataset.push(example),
                None => skipped += 1,
            }
        }

        dataset.write_jsonl(&self.config.output_file)?;
        Ok(RunSummary {
            examples: dataset.len(),
            skipped,
        })
    }

    /// Build the training record for one paper, or `None` if any stage
    /// excludes it. A paper with empty extracted text never yields an
    /// example, regardless of its other artifacts.
    async fn process_paper(&self, path: &Path) -> Option<FineTuneExample> {
        log::info!("processing {}", path.display());

        let intro = extract_intro(path, &self.config.page_window());
        if intro.is_empty() {
            log::warn!("{}: no intro text extracted, skipping", path.display());
            return None;
        }

        let bundle = match load_metadata(path) {
            Ok(bundle) => bundle,
            Err(e) => {
                log::warn!("{}: {e}, skipping", path.display());
                return None;
            }
        };

        let question = match self.deriver.derive(&intro).await {
            Ok(question) => question,
            Err(e) => {
                log::warn!("{}: question derivation failed: {e}, skipping", path.display());
                return None;
            }
        };

        Some(build_example(
            &bundle,
            &self.config.record_delimiter,
            &question,
            &intro,
        ))
    }
}

/// List `*.pdf` files in `dir`, sorted by name for a deterministic
/// dataset order.
pub fn list_papers(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut papers = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if path.is_file() && is_pdf {
            papers.push(path);
        }
    }
    papers.sort();
    Ok(papers)
}
