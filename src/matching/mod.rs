//! Agentic matching engine: scores a candidate against a job by combining
//! résumé fields with enrichment context, via the LLM-backed
//! [`scoring::score_candidate`] call, wrapped in the six-step loop and
//! batch-audit machinery in [`engine::MatchingEngine`].

pub mod engine;
pub mod scoring;

pub use engine::MatchingEngine;
pub use scoring::{select_sources, score_candidate, MatchScore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("enrichment error: {0}")]
    Enrichment(#[from] crate::enrichment::EnrichmentError),
}
