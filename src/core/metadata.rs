//! Reference metadata side-files.
//!
//! Every source paper may carry a CSV side-file (same base name, `.csv`
//! extension) listing its cited papers with title, abstract, authors and
//! publication year. The loader normalizes rows into structured
//! [`ReferenceRecord`]s; string formatting is deferred to
//! [`MetadataBundle::render`] so the delimiter stays a rendering concern
//! rather than part of the data.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default delimiter between rendered reference records.
pub const DEFAULT_RECORD_DELIMITER: &str = "||";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("no metadata side-file at {0}")]
    MissingSideFile(PathBuf),

    #[error("failed to read metadata file: {0}")]
    Csv(#[from] csv::Error),
}

/// Raw CSV row as written by the harvester.
#[derive(Debug, Deserialize)]
struct RawReference {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Option<String>,
    #[serde(rename = "publicationYear", default)]
    publication_year: Option<String>,
}

/// One cited paper, normalized for prompt rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRecord {
    pub title: String,
    pub abstract_text: String,
    /// Author names with the literal bracket characters stripped.
    pub authors: String,
    /// Publication year, `"?"` when the source had none.
    pub publication_year: String,
}

impl ReferenceRecord {
    fn from_raw(raw: RawReference) -> Self {
        let publication_year = match raw.publication_year {
            Some(year) if !year.trim().is_empty() => year,
            _ => "?".to_string(),
        };
        let authors = raw
            .authors
            .unwrap_or_default()
            .replace(['[', ']'], "");
        Self {
            title: raw.title.unwrap_or_default(),
            abstract_text: raw.abstract_text.unwrap_or_default(),
            authors,
            publication_year,
        }
    }

    fn render(&self) -> String {
        format!(
            "title:'{}'. abstract:'{}'. authors:'{}'. pubyear:'{}'",
            self.title, self.abstract_text, self.authors, self.publication_year
        )
    }
}

/// All reference metadata for one source paper, in side-file order.
#[derive(Debug, Clone, Default)]
pub struct MetadataBundle {
    records: Vec<ReferenceRecord>,
}

impl MetadataBundle {
    pub fn new(records: Vec<ReferenceRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize every record and join them with `delimiter`.
    ///
    /// The delimiter must not occur in titles or abstracts; `||` is the
    /// documented default.
    pub fn render(&self, delimiter: &str) -> String {
        self.records
            .iter()
            .map(|record| record.render())
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

/// Load and normalize the metadata side-file for one source paper.
///
/// The side-file path is derived from the paper path by swapping the
/// extension for `.csv`. A missing file is an error for this document
/// only; malformed rows are logged and skipped individually.
pub fn load_metadata(pdf_path: &Path) -> Result<MetadataBundle, MetadataError> {
    let side_file = pdf_path.with_extension("csv");
    if !side_file.exists() {
        return Err(MetadataError::MissingSideFile(side_file));
    }

    let mut reader = csv::Reader::from_path(&side_file)?;
    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<RawReference>().enumerate() {
        match result {
            Ok(raw) => records.push(ReferenceRecord::from_raw(raw)),
            Err(e) => {
                log::warn!("{}: skipping malformed row {}: {e}", side_file.display(), row + 1);
            }
        }
    }

    Ok(MetadataBundle::new(records))
}
