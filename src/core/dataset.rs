//! Fine-tuning dataset records and JSONL serialization.
//!
//! A [`FineTuneExample`] pairs the instruction prompt (reference
//! metadata plus research question) with the paper's own literature
//! review as the completion. The finished [`Dataset`] is written once,
//! one JSON object per line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::metadata::MetadataBundle;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to write dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize example: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One (prompt, completion) training record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FineTuneExample {
    pub prompt: String,
    pub completion: String,
}

/// Build the training record for one source paper.
///
/// All three artifacts must come from the same document; the pipeline
/// guarantees this by constructing each record in one pass instead of
/// collecting per-artifact maps. The prompt is filled in a single
/// `format!` pass, so embedded metadata or question text is never
/// rescanned for slot markers.
pub fn build_example(
    bundle: &MetadataBundle,
    delimiter: &str,
    question: &str,
    intro: &str,
) -> FineTuneExample {
    let prompt = format!(
        "The following is a list of paper metadata separated by {delimiter}. \
         Each element in the list includes: title, abstract, author names, publication year. \
         The items in this list are the papers referenced by the target paper. \
         list of paper metadata = {metadata}. \
         The following is the research question from the target paper. \
         research question = '{question}'. \
         Using abstract of papers content in the list of paper metadata, \
         and considering the research question, \
         learn to write the target paper's literature review. \
         Remember target paper's literature review may contain material \
         that are not directly or indirectly related to the content in the list of paper metadata. \
         Ignore those parts in target paper's literature review. \
         The following is target paper's literature review:",
        delimiter = delimiter,
        metadata = bundle.render(delimiter),
        question = question,
    );
    FineTuneExample {
        prompt,
        completion: intro.to_string(),
    }
}

/// Ordered collection of training records, one per usable paper.
#[derive(Debug, Default)]
pub struct Dataset {
    examples: Vec<FineTuneExample>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, example: FineTuneExample) {
        self.examples.push(example);
    }

    pub fn examples(&self) -> &[FineTuneExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Write the dataset as line-delimited JSON, overwriting `path`.
    pub fn write_jsonl(&self, path: &Path) -> Result<(), DatasetError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for example in &self.examples {
            let line = serde_json::to_string(example)?;
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
        log::info!("wrote {} examples to {}", self.examples.len(), path.display());
        Ok(())
    }
}
