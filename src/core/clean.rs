//! Text cleaning for extracted PDF pages.
//!
//! Two-stage cleanup: [`strip_layout_artifacts`] removes captions, page
//! ranges and footnote markers while line boundaries are still intact,
//! then [`clean`] normalizes whitespace and strips extraction artifacts.
//! The order matters: caption patterns run to end-of-line, so they must
//! be applied before newlines are collapsed away.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches table captions: "Table 3: Results" up to end of line
static TABLE_CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Table\s+\d+:[^\n]*\n?").expect("Invalid table caption regex"));

/// Matches figure captions: "Figure 1: Overview" up to end of line
static FIGURE_CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Figure\s+\d+:[^\n]*\n?").expect("Invalid figure caption regex"));

/// Matches generic table/figure mentions that start a line fragment
static FLOAT_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:Table|Figure)\s+\d+[^\n]*\n?").expect("Invalid float mention regex")
});

/// Matches number ranges resembling page references, e.g. "12 - 34"
static PAGE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\s*-\s*\d+").expect("Invalid page range regex"));

/// Matches bracketed spans, e.g. footnote markers like "[12]" or "[see 3]"
static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("Invalid bracket regex"));

/// Matches "(cid:1234)" placeholders left behind by PDF text extraction
static CID_ARTIFACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(cid:\d+\)").expect("Invalid cid regex"));

/// Matches runs of whitespace, including newlines
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Remove tables, figures, footnotes and page-number ranges from raw page
/// text. Relies on line boundaries still being present, so call this
/// before [`clean`].
pub fn strip_layout_artifacts(text: &str) -> String {
    let text = TABLE_CAPTION.replace_all(text, "");
    let text = FIGURE_CAPTION.replace_all(&text, "");
    let text = FLOAT_MENTION.replace_all(&text, "");
    let text = PAGE_RANGE.replace_all(&text, "");
    let text = BRACKETED.replace_all(&text, "");
    text.trim().to_string()
}

/// Normalize cleaned page text: drop "(cid:N)" extraction artifacts and
/// any remaining bracketed spans, collapse whitespace runs (including
/// newlines) to single spaces, and trim. Idempotent.
pub fn clean(text: &str) -> String {
    let text = CID_ARTIFACT.replace_all(text, "");
    let text = BRACKETED.replace_all(&text, "");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}
