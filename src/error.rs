//! Shared error types for the résumé ingestion and matching core.
//!
//! Each subsystem owns a narrow `thiserror` enum local to its module
//! (`storage::StorageError`, `queue::QueueError`, `pipeline::PipelineError`,
//! `enrichment::EnrichmentError`, `matching::MatchingError`, `llm::LlmError`).
//! [`CoreError`] aggregates them for call sites that need to surface a single
//! typed error to an upstream caller.

use thiserror::Error;

use crate::enrichment::EnrichmentError;
use crate::llm::LlmError;
use crate::matching::MatchingError;
use crate::pipeline::PipelineError;
use crate::queue::QueueError;
use crate::storage::StorageError;

/// Top-level error returned by the core's public operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),

    #[error(transparent)]
    Matching(#[from] MatchingError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// A named entity could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller-supplied input failed validation (empty file, oversize, unsupported
    /// extension, missing field). Never retried, never enqueued.
    #[error("validation failed: {0}")]
    Validation(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
