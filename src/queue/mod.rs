//! PostgreSQL-backed durable job queue.
//!
//! This module provides the job queue backing the résumé-ingestion and
//! matching pipelines. Unlike the Redis queues this project's ancestors
//! used, the queue lives entirely in the `job_queue` table and supports:
//!
//! - Row-locked claiming with `SELECT ... FOR UPDATE SKIP LOCKED`, ordered
//!   `(priority DESC, created_at ASC, id ASC)`.
//! - Scheduled (delayed) enqueue: a row with `scheduled_for` in the future
//!   is invisible to `claim` until that time passes.
//! - Heartbeat liveness: a claimed row's `heartbeat_at` is bumped
//!   periodically by the worker holding it; the scheduler reclaims rows
//!   whose heartbeat has gone stale.
//! - Retry with exponential backoff: `scheduled_for = now + base * 2^retry_count`,
//!   capped, until `retry_count` reaches `max_retries`, at which point the
//!   job is marked terminal `FAILED`.
//!
//! # Queue structure
//!
//! All state lives in one table (`job_queue`); there is no separate
//! processing/dead-letter table. `status` carries PENDING, PROCESSING,
//! COMPLETED, FAILED and CANCELLED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("job {0} is in terminal state {1:?} and cannot be claimed")]
    TerminalState(Uuid, JobStatus),
}

/// The kind of work a queued job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Parse and extract a single résumé file.
    ResumeIngest,
    /// Fan out a zip archive's entries into individual `ResumeIngest` jobs.
    ArchiveExpand,
    /// Run the matching engine for every candidate against one job.
    MatchJob,
    /// Refresh a single candidate's external profile for one source.
    EnrichProfile,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ResumeIngest => "resume_ingest",
            JobKind::ArchiveExpand => "archive_expand",
            JobKind::MatchJob => "match_job",
            JobKind::EnrichProfile => "enrich_profile",
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "resume_ingest" => JobKind::ResumeIngest,
            "archive_expand" => JobKind::ArchiveExpand,
            "match_job" => JobKind::MatchJob,
            "enrich_profile" => JobKind::EnrichProfile,
            _ => return Err(()),
        })
    }
}

/// Lifecycle status of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::str::FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PENDING" => JobStatus::Pending,
            "PROCESSING" => JobStatus::Processing,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            "CANCELLED" => JobStatus::Cancelled,
            _ => return Err(()),
        })
    }
}

/// A row in `job_queue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub priority: i32,
    pub file_bytes: Option<Vec<u8>>,
    pub metadata: serde_json::Value,
    pub correlation_id: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub heartbeat_at: Option<DateTime<Utc>>,
    pub claimed_by: Option<String>,
    pub error_message: Option<String>,
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Per-status job counts for one [`JobKind`], as returned by
/// [`JobQueue::stats_by_kind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindStats {
    pub kind: JobKind,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
}

fn row_to_job(row: sqlx::postgres::PgRow) -> Job {
    let kind: String = row.get("kind");
    let status: String = row.get("status");
    Job {
        id: row.get("id"),
        kind: kind.parse().unwrap_or(JobKind::ResumeIngest),
        status: status.parse().unwrap_or(JobStatus::Pending),
        priority: row.get("priority"),
        file_bytes: row.get("file_bytes"),
        metadata: row.get("metadata"),
        correlation_id: row.get("correlation_id"),
        retry_count: row.get("retry_count"),
        max_retries: row.get("max_retries"),
        scheduled_for: row.get("scheduled_for"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        heartbeat_at: row.get("heartbeat_at"),
        claimed_by: row.get("claimed_by"),
        error_message: row.get("error_message"),
        result: row.get("result"),
        created_at: row.get("created_at"),
    }
}

/// Exponential backoff schedule for retries: `base * 2^retry_count`, capped.
pub fn backoff_delay(base: Duration, cap: Duration, retry_count: i32) -> Duration {
    let scaled = base.saturating_mul(1u32.checked_shl(retry_count as u32).unwrap_or(u32::MAX));
    scaled.min(cap)
}

/// Builder for a new job insertion.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub kind: JobKind,
    pub priority: i32,
    pub file_bytes: Option<Vec<u8>>,
    pub metadata: serde_json::Value,
    pub correlation_id: Option<String>,
    pub max_retries: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl NewJob {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            priority: 0,
            file_bytes: None,
            metadata: serde_json::json!({}),
            correlation_id: None,
            max_retries: 3,
            scheduled_for: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_file_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.file_bytes = Some(bytes);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }
}

/// Durable, PostgreSQL-backed job queue.
pub struct JobQueue {
    pool: PgPool,
    retry_base: Duration,
    retry_cap: Duration,
}

impl JobQueue {
    pub fn new(pool: PgPool, retry_base: Duration, retry_cap: Duration) -> Self {
        Self {
            pool,
            retry_base,
            retry_cap,
        }
    }

    pub async fn enqueue(&self, job: NewJob) -> Result<Uuid, QueueError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO job_queue
                (id, kind, status, priority, file_bytes, metadata, correlation_id,
                 retry_count, max_retries, scheduled_for, created_at)
            VALUES ($1, $2, 'PENDING', $3, $4, $5, $6, 0, $7, $8, NOW())
            "#,
        )
        .bind(id)
        .bind(job.kind.as_str())
        .bind(job.priority)
        .bind(&job.file_bytes)
        .bind(&job.metadata)
        .bind(&job.correlation_id)
        .bind(job.max_retries)
        .bind(job.scheduled_for)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Claim up to `limit` jobs of `kind` ready to run, skipping rows locked
    /// by other workers and rows scheduled for the future. Ordered
    /// `(priority DESC, created_at ASC, id ASC)` so older, higher-priority
    /// jobs are claimed first and ties break deterministically.
    pub async fn claim(&self, kind: JobKind, worker_id: &str, limit: i64) -> Result<Vec<Job>, QueueError> {
        let rows = sqlx::query(
            r#"
            UPDATE job_queue
            SET status = 'PROCESSING',
                claimed_by = $1,
                started_at = NOW(),
                heartbeat_at = NOW()
            WHERE id IN (
                SELECT id FROM job_queue
                WHERE status = 'PENDING'
                  AND kind = $2
                  AND (scheduled_for IS NULL OR scheduled_for <= NOW())
                ORDER BY priority DESC, created_at ASC, id ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, kind, status, priority, file_bytes, metadata, correlation_id,
                      retry_count, max_retries, scheduled_for, started_at, completed_at,
                      heartbeat_at, claimed_by, error_message, result, created_at
            "#,
        )
        .bind(worker_id)
        .bind(kind.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    pub async fn heartbeat(&self, job_id: Uuid) -> Result<(), QueueError> {
        let result = sqlx::query(
            "UPDATE job_queue SET heartbeat_at = NOW() WHERE id = $1 AND status = 'PROCESSING'",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::JobNotFound(job_id));
        }
        Ok(())
    }

    pub async fn complete(&self, job_id: Uuid, result: serde_json::Value) -> Result<(), QueueError> {
        sqlx::query(
            r#"
            UPDATE job_queue
            SET status = 'COMPLETED', completed_at = NOW(), result = $1
            WHERE id = $2
            "#,
        )
        .bind(result)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fail a job. Schedules a retry with exponential backoff if
    /// `retry_count < max_retries`; otherwise marks it terminally `FAILED`.
    pub async fn fail(&self, job_id: Uuid, error_message: &str) -> Result<(), QueueError> {
        let row = sqlx::query(
            "SELECT retry_count, max_retries FROM job_queue WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(QueueError::JobNotFound(job_id))?;

        let retry_count: i32 = row.get("retry_count");
        let max_retries: i32 = row.get("max_retries");

        if retry_count < max_retries {
            let delay = backoff_delay(self.retry_base, self.retry_cap, retry_count);
            let scheduled_for = Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(30));

            sqlx::query(
                r#"
                UPDATE job_queue
                SET status = 'PENDING',
                    retry_count = retry_count + 1,
                    scheduled_for = $1,
                    error_message = $2,
                    claimed_by = NULL,
                    heartbeat_at = NULL
                WHERE id = $3
                "#,
            )
            .bind(scheduled_for)
            .bind(error_message)
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE job_queue
                SET status = 'FAILED', completed_at = NOW(), error_message = $1
                WHERE id = $2
                "#,
            )
            .bind(error_message)
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Mark a job terminally `FAILED`, bypassing the retry schedule. Used
    /// for failures classified as non-retryable (validation errors, corrupt
    /// input) where another attempt cannot succeed.
    pub async fn fail_terminal(&self, job_id: Uuid, error_message: &str) -> Result<(), QueueError> {
        sqlx::query(
            r#"
            UPDATE job_queue
            SET status = 'FAILED', completed_at = NOW(), error_message = $1
            WHERE id = $2
            "#,
        )
        .bind(error_message)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<bool, QueueError> {
        let result = sqlx::query(
            "UPDATE job_queue SET status = 'CANCELLED', completed_at = NOW() \
             WHERE id = $1 AND status IN ('PENDING', 'PROCESSING')",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Requeue jobs whose heartbeat is older than `stale_threshold`. Returns
    /// the number of jobs recovered.
    pub async fn reset_stale(&self, stale_threshold: Duration) -> Result<u64, QueueError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(stale_threshold).unwrap_or_else(|_| chrono::Duration::seconds(900));

        let result = sqlx::query(
            r#"
            UPDATE job_queue
            SET status = 'PENDING', claimed_by = NULL, heartbeat_at = NULL
            WHERE status = 'PROCESSING' AND heartbeat_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Job, QueueError> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, status, priority, file_bytes, metadata, correlation_id,
                   retry_count, max_retries, scheduled_for, started_at, completed_at,
                   heartbeat_at, claimed_by, error_message, result, created_at
            FROM job_queue WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(QueueError::JobNotFound(job_id))?;

        Ok(row_to_job(row))
    }

    pub async fn by_correlation(&self, correlation_id: &str) -> Result<Vec<Job>, QueueError> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, status, priority, file_bytes, metadata, correlation_id,
                   retry_count, max_retries, scheduled_for, started_at, completed_at,
                   heartbeat_at, claimed_by, error_message, result, created_at
            FROM job_queue WHERE correlation_id = $1 ORDER BY created_at ASC
            "#,
        )
        .bind(correlation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    pub async fn by_status(&self, status: JobStatus) -> Result<Vec<Job>, QueueError> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, status, priority, file_bytes, metadata, correlation_id,
                   retry_count, max_retries, scheduled_for, started_at, completed_at,
                   heartbeat_at, claimed_by, error_message, result, created_at
            FROM job_queue WHERE status = $1 ORDER BY priority DESC, created_at ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    /// Count jobs in `status`, optionally restricted to one `kind`.
    pub async fn count_by_status(&self, status: JobStatus, kind: Option<JobKind>) -> Result<i64, QueueError> {
        let row = match kind {
            Some(kind) => {
                sqlx::query("SELECT COUNT(*) AS n FROM job_queue WHERE status = $1 AND kind = $2")
                    .bind(status.as_str())
                    .bind(kind.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT COUNT(*) AS n FROM job_queue WHERE status = $1")
                    .bind(status.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(row.get("n"))
    }

    /// Count of PENDING jobs, optionally restricted to one `kind`.
    pub async fn queue_depth(&self, kind: Option<JobKind>) -> Result<i64, QueueError> {
        self.count_by_status(JobStatus::Pending, kind).await
    }

    /// Mean seconds between `started_at` and `completed_at` for `kind`'s
    /// completed jobs. `None` if no completed job of that kind exists yet.
    pub async fn average_processing_seconds(&self, kind: JobKind) -> Result<Option<f64>, QueueError> {
        let row = sqlx::query(
            r#"
            SELECT AVG(EXTRACT(EPOCH FROM (completed_at - started_at))) AS avg_seconds
            FROM job_queue
            WHERE kind = $1 AND status = 'COMPLETED' AND started_at IS NOT NULL AND completed_at IS NOT NULL
            "#,
        )
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("avg_seconds"))
    }

    /// Per-status counts for one `kind`.
    pub async fn stats_by_kind(&self, kind: JobKind) -> Result<KindStats, QueueError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE status = 'PROCESSING') AS processing,
                COUNT(*) FILTER (WHERE status = 'COMPLETED') AS completed,
                COUNT(*) FILTER (WHERE status = 'FAILED') AS failed,
                COUNT(*) FILTER (WHERE status = 'CANCELLED') AS cancelled
            FROM job_queue
            WHERE kind = $1
            "#,
        )
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(KindStats {
            kind,
            pending: row.get("pending"),
            processing: row.get("processing"),
            completed: row.get("completed"),
            failed: row.get("failed"),
            cancelled: row.get("cancelled"),
        })
    }

    /// Jobs of `kind` currently scheduled for a retry attempt (PENDING with
    /// at least one prior attempt), ordered by `scheduled_for` so the
    /// soonest-due retry comes first.
    pub async fn find_for_retry(&self, kind: JobKind, limit: i64) -> Result<Vec<Job>, QueueError> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, status, priority, file_bytes, metadata, correlation_id,
                   retry_count, max_retries, scheduled_for, started_at, completed_at,
                   heartbeat_at, claimed_by, error_message, result, created_at
            FROM job_queue
            WHERE kind = $1 AND status = 'PENDING' AND retry_count > 0
            ORDER BY scheduled_for ASC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(kind.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    pub async fn delete_completed_older_than(&self, age: Duration) -> Result<u64, QueueError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(age).unwrap_or_else(|_| chrono::Duration::days(30));

        let result = sqlx::query(
            "DELETE FROM job_queue WHERE status IN ('COMPLETED', 'CANCELLED') AND completed_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_round_trips_through_str() {
        for kind in [
            JobKind::ResumeIngest,
            JobKind::ArchiveExpand,
            JobKind::MatchJob,
            JobKind::EnrichProfile,
        ] {
            let parsed: JobKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed.as_str(), kind.as_str());
        }
    }

    #[test]
    fn job_status_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn backoff_grows_exponentially_then_caps() {
        let base = Duration::from_secs(30);
        let cap = Duration::from_secs(15 * 60);

        assert_eq!(backoff_delay(base, cap, 0), Duration::from_secs(30));
        assert_eq!(backoff_delay(base, cap, 1), Duration::from_secs(60));
        assert_eq!(backoff_delay(base, cap, 2), Duration::from_secs(120));
        assert_eq!(backoff_delay(base, cap, 10), cap);
    }

    #[test]
    fn new_job_builder_defaults() {
        let job = NewJob::new(JobKind::ResumeIngest);
        assert_eq!(job.priority, 0);
        assert_eq!(job.max_retries, 3);
        assert!(job.scheduled_for.is_none());
    }
}
