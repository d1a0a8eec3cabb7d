//! Wires the document parser, chunker, LLM extraction and storage layers
//! into a single [`JobHandler`] that executes one résumé (or archive
//! fan-out) job end to end.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::config::EmbeddingConfig;
use crate::llm::LlmClient;
use crate::queue::{Job, JobKind, JobQueue, NewJob};
use crate::scheduler::{JobFailure, JobHandler};
use crate::storage::{Candidate, Database, ResumeEmbedding, TrackerStatus};

use super::chunking::chunk_resume_text;
use super::extraction::{embed_chunks, extract_resume};
use super::parser::{self, ParseError};

/// Reads a required string field out of a job's metadata object.
fn required_field<'a>(metadata: &'a serde_json::Value, key: &str) -> Result<&'a str, JobFailure> {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| JobFailure::terminal(format!("invalid job metadata: missing '{key}'")))
}

fn parse_tracker_id(metadata: &serde_json::Value) -> Result<Uuid, JobFailure> {
    let raw = required_field(metadata, "tracker_id")?;
    Uuid::parse_str(raw)
        .map_err(|e| JobFailure::terminal(format!("invalid job metadata: malformed tracker_id: {e}")))
}

/// Executes `ResumeIngest` and `ArchiveExpand` jobs: parses the uploaded
/// document, runs LLM-backed extraction with graceful fallback, chunks and
/// embeds the résumé text, and persists everything under one candidate row.
pub struct PipelineRunner {
    db: Arc<Database>,
    queue: Arc<JobQueue>,
    llm: Arc<LlmClient>,
    embedding: EmbeddingConfig,
}

impl PipelineRunner {
    pub fn new(
        db: Arc<Database>,
        queue: Arc<JobQueue>,
        llm: Arc<LlmClient>,
        embedding: EmbeddingConfig,
    ) -> Self {
        Self {
            db,
            queue,
            llm,
            embedding,
        }
    }

    async fn heartbeat(&self, job_id: Uuid) {
        if let Err(e) = self.queue.heartbeat(job_id).await {
            warn!(job_id = %job_id, error = %e, "heartbeat failed");
        }
    }

    async fn mark_tracker_failed(&self, tracker_id: Uuid, message: &str) {
        if let Err(e) = self
            .db
            .update_tracker(tracker_id, TrackerStatus::Failed, 0, 1, message)
            .await
        {
            warn!(tracker_id = %tracker_id, error = %e, "failed to record tracker failure");
        }
    }

    async fn handle_resume_ingest(&self, job: &Job) -> Result<serde_json::Value, JobFailure> {
        let tracker_id = parse_tracker_id(&job.metadata)?;
        let filename = required_field(&job.metadata, "filename")?.to_string();

        if let Err(e) = self.db.get_tracker(tracker_id).await {
            return Err(JobFailure::terminal(format!("invalid job metadata: unknown tracker: {e}")));
        }
        if let Err(e) = self.db.link_tracker_job(tracker_id, job.id).await {
            warn!(job_id = %job.id, error = %e, "failed to link tracker to job");
        }

        let file_bytes = job
            .file_bytes
            .clone()
            .ok_or_else(|| JobFailure::terminal("invalid job: missing file bytes"))?;

        let extension = parser::extension_of(&filename).ok_or_else(|| {
            JobFailure::terminal(format!("unsupported file: {filename} has no extension"))
        })?;

        let parser = parser::parser_for_extension(&extension).ok_or_else(|| {
            JobFailure::terminal(format!("unsupported extension: {extension}"))
        })?;

        self.heartbeat(job.id).await;

        let text = parser.parse(&file_bytes).map_err(|e| match e {
            ParseError::UnsupportedExtension(ext) => {
                JobFailure::terminal(format!("unsupported extension: {ext}"))
            }
            ParseError::Malformed(msg) => JobFailure::terminal(format!("malformed document: {msg}")),
            ParseError::Io(e) => JobFailure::retryable(format!("io error reading document: {e}")),
        })?;

        self.heartbeat(job.id).await;

        let extracted = extract_resume(&self.llm, &text).await;

        self.db
            .update_tracker(
                tracker_id,
                TrackerStatus::ResumeAnalyzed,
                0,
                0,
                "résumé analyzed",
            )
            .await
            .map_err(|e| JobFailure::retryable(format!("failed to update tracker: {e}")))?;

        let candidate = Candidate {
            id: Uuid::new_v4(),
            name: extracted.name,
            email: extracted.email,
            phone: extracted.phone,
            skills: extracted.skills,
            domain_knowledge: extracted.domain_knowledge,
            academic_background: extracted.academic_background,
            years_of_experience: extracted.years_of_experience,
            resume_bytes: file_bytes,
            extracted_text: text.clone(),
            created_at: Utc::now(),
        };

        self.db
            .insert_candidate(&candidate)
            .await
            .map_err(|e| JobFailure::retryable(format!("failed to store candidate: {e}")))?;

        self.heartbeat(job.id).await;

        let chunks = chunk_resume_text(&text);
        let chunk_texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_chunks(
            &self.llm,
            &chunk_texts,
            self.embedding.batch_size,
            self.embedding.dimensions,
        )
        .await;

        let embeddings: Vec<ResumeEmbedding> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| ResumeEmbedding {
                id: Uuid::new_v4(),
                candidate_id: candidate.id,
                chunk: chunk.text,
                embedding,
                section_type: chunk.section_type,
                created_at: Utc::now(),
            })
            .collect();

        self.db
            .replace_embeddings(candidate.id, &embeddings)
            .await
            .map_err(|e| JobFailure::retryable(format!("failed to store embeddings: {e}")))?;

        self.db
            .update_tracker(
                tracker_id,
                TrackerStatus::EmbedGenerated,
                0,
                0,
                "embeddings generated",
            )
            .await
            .map_err(|e| JobFailure::retryable(format!("failed to update tracker: {e}")))?;

        self.db
            .update_tracker(
                tracker_id,
                TrackerStatus::VectorDbUpdated,
                0,
                0,
                "vectors persisted",
            )
            .await
            .map_err(|e| JobFailure::retryable(format!("failed to update tracker: {e}")))?;

        self.db
            .update_tracker(
                tracker_id,
                TrackerStatus::Completed,
                1,
                0,
                &format!("résumé processed: {filename}"),
            )
            .await
            .map_err(|e| JobFailure::retryable(format!("failed to update tracker: {e}")))?;

        Ok(json!({ "candidate_id": candidate.id }))
    }

    async fn handle_archive_expand(&self, job: &Job) -> Result<serde_json::Value, JobFailure> {
        let tracker_id = parse_tracker_id(&job.metadata)?;
        let correlation_id = job.correlation_id.clone();

        let archive_bytes = job
            .file_bytes
            .clone()
            .ok_or_else(|| JobFailure::terminal("invalid job: missing archive bytes"))?;

        self.heartbeat(job.id).await;

        let entries = parser::expand_zip(&archive_bytes).map_err(|e| match e {
            ParseError::Malformed(msg) => JobFailure::terminal(format!("malformed archive: {msg}")),
            other => JobFailure::terminal(format!("invalid archive: {other}")),
        })?;

        if entries.is_empty() {
            self.mark_tracker_failed(tracker_id, "archive contained no supported résumé files")
                .await;
            return Err(JobFailure::terminal(
                "invalid archive: no supported résumé files found",
            ));
        }

        self.db
            .update_tracker_with_total(
                tracker_id,
                TrackerStatus::Initiated,
                0,
                0,
                &format!("expanding archive into {} files", entries.len()),
                Some(entries.len() as i32),
            )
            .await
            .map_err(|e| JobFailure::retryable(format!("failed to update tracker: {e}")))?;

        let mut enqueued = Vec::with_capacity(entries.len());
        for entry in entries {
            let metadata = json!({
                "tracker_id": tracker_id.to_string(),
                "filename": entry.filename,
            });

            let mut new_job = NewJob::new(JobKind::ResumeIngest)
                .with_file_bytes(entry.bytes)
                .with_metadata(metadata)
                .with_priority(job.priority);

            if let Some(correlation_id) = &correlation_id {
                new_job = new_job.with_correlation_id(correlation_id.clone());
            }

            let job_id = self
                .queue
                .enqueue(new_job)
                .await
                .map_err(|e| JobFailure::retryable(format!("failed to enqueue child job: {e}")))?;
            enqueued.push(job_id);
        }

        Ok(json!({ "enqueued_jobs": enqueued }))
    }
}

#[async_trait]
impl JobHandler for PipelineRunner {
    async fn handle(&self, job: Job) -> Result<serde_json::Value, JobFailure> {
        match job.kind {
            JobKind::ResumeIngest => self.handle_resume_ingest(&job).await,
            JobKind::ArchiveExpand => self.handle_archive_expand(&job).await,
            other => Err(JobFailure::terminal(format!(
                "unsupported job kind for résumé pipeline handler: {other:?}"
            ))),
        }
    }
}

/// Dispatches a job to whichever registered handler owns its [`JobKind`].
/// Lets the résumé pipeline, matching engine and enrichment service each
/// own a focused [`JobHandler`] while the scheduler still talks to one.
pub struct RoutingJobHandler {
    routes: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl RoutingJobHandler {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn with_route(mut self, kind: JobKind, handler: Arc<dyn JobHandler>) -> Self {
        self.routes.insert(kind, handler);
        self
    }
}

impl Default for RoutingJobHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobHandler for RoutingJobHandler {
    async fn handle(&self, job: Job) -> Result<serde_json::Value, JobFailure> {
        match self.routes.get(&job.kind) {
            Some(handler) => handler.handle(job).await,
            None => Err(JobFailure::terminal(format!(
                "no handler registered for job kind {:?}",
                job.kind
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_field_errors_on_missing_key() {
        let metadata = json!({ "filename": "resume.pdf" });
        assert!(required_field(&metadata, "tracker_id").is_err());
        assert_eq!(required_field(&metadata, "filename").unwrap(), "resume.pdf");
    }

    #[test]
    fn parse_tracker_id_rejects_non_uuid_string() {
        let metadata = json!({ "tracker_id": "not-a-uuid" });
        assert!(parse_tracker_id(&metadata).is_err());
    }

    #[test]
    fn parse_tracker_id_accepts_valid_uuid() {
        let id = Uuid::new_v4();
        let metadata = json!({ "tracker_id": id.to_string() });
        assert_eq!(parse_tracker_id(&metadata).unwrap(), id);
    }

    #[tokio::test]
    async fn routing_handler_with_no_routes_errors_terminally() {
        let handler = RoutingJobHandler::new();
        let job = Job {
            id: Uuid::new_v4(),
            kind: JobKind::MatchJob,
            status: crate::queue::JobStatus::Processing,
            priority: 0,
            file_bytes: None,
            metadata: json!({}),
            correlation_id: None,
            retry_count: 0,
            max_retries: 3,
            scheduled_for: None,
            started_at: None,
            completed_at: None,
            heartbeat_at: None,
            claimed_by: None,
            error_message: None,
            result: None,
            created_at: Utc::now(),
        };

        let result = handler.handle(job).await;
        assert!(matches!(result, Err(f) if !f.retryable));
    }
}
