//! Core of the IR deck evaluation pipeline, shared by the service binaries:
//! content fingerprinting, the model oracle client, deterministic scoring,
//! the two-stage orchestrator, the persistent cache, batch execution and
//! report/export rendering.

pub mod batch;
pub mod cache;
pub mod config;
pub mod dto;
pub mod error;
pub mod fingerprint;
pub mod json_relaxed;
pub mod oracle;
pub mod orchestrator;
pub mod prompt;
pub mod report;
pub mod retry;
pub mod scoring;
