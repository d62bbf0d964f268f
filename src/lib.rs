//! Paperforge - fine-tuning dataset pipeline for academic papers
//!
//! Core library for extracting literature-review text from PDFs,
//! joining it with reference metadata and an LLM-derived research
//! question, and assembling (prompt, completion) training records.

pub mod config;
pub mod core;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
