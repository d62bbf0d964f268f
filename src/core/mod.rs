//! Core pipeline modules.
//!
//! The dataset flow per source document is:
//! extract ([`extract`]) -> metadata ([`metadata`]) -> question ([`question`])
//! -> record assembly ([`dataset`]), orchestrated by [`pipeline`].
//! [`finetune`] submits a finished dataset, [`harvest`] produces the
//! metadata side-files the loader consumes.

pub mod clean;
pub mod dataset;
pub mod extract;
pub mod finetune;
pub mod harvest;
pub mod metadata;
pub mod pipeline;
pub mod question;
pub mod retry;
