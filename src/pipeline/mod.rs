//! Résumé ingestion pipeline: document parsing, text chunking, LLM-backed
//! field extraction and embedding, tied together by a [`JobHandler`] that
//! the scheduler's worker pool dispatches jobs to.
//!
//! # Pipeline flow
//!
//! 1. **Parse**: [`parser`] extracts plain text from PDF, DOCX or legacy
//!    `.doc` bytes; a `.zip` upload fans out into one `ResumeIngest` job per
//!    supported file inside it.
//! 2. **Chunk**: [`chunking`] splits the extracted text into section-tagged
//!    chunks capped at 1000 characters.
//! 3. **Extract**: [`extraction`] asks the LLM for structured candidate
//!    fields, falling back to an "Unknown" placeholder on any LLM failure
//!    rather than failing the job.
//! 4. **Embed & persist**: [`extraction::embed_chunks`] embeds every chunk
//!    (falling back to a zero vector per chunk on failure) and
//!    [`runner::PipelineRunner`] persists the candidate row and embeddings.

pub mod chunking;
pub mod extraction;
pub mod parser;
pub mod runner;

pub use chunking::{chunk_resume_text, Chunk};
pub use extraction::{embed_chunks, extract_resume, ExtractedResume};
pub use parser::{
    expand_zip, extension_of, is_supported_extension, parser_for_extension, DocumentParser,
    ParseError, ZipEntry,
};
pub use runner::{PipelineRunner, RoutingJobHandler};

use thiserror::Error;

/// Top-level error for the résumé ingestion pipeline, surfaced to callers
/// outside the job queue (e.g. a synchronous upload endpoint that wants to
/// report a parse failure immediately rather than enqueuing and polling).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("queue error: {0}")]
    Queue(#[from] crate::queue::QueueError),

    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}
