//! Bounded worker pool that executes claimed jobs.
//!
//! Concurrency is capped by an active-counter gate (a `tokio::sync::Semaphore`):
//! `dispatch` blocks until a permit is free, so the dispatch loop never
//! oversubscribes the pool. Each accepted job runs in its own `tokio::spawn`
//! task; the permit is released when that task finishes, successfully or not.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::queue::{Job, JobQueue};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("queue error: {0}")]
    Queue(#[from] crate::queue::QueueError),
}

/// A job execution failure, classified so the pool knows whether another
/// attempt could succeed.
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub message: String,
    pub retryable: bool,
}

impl JobFailure {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Implemented by whatever understands how to execute a job's payload
/// (the résumé pipeline, the matching engine, the enrichment service).
/// The pool itself is agnostic to `JobKind`; it dispatches every claimed
/// job to the same handler and lets the handler route on `job.kind`.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job) -> Result<serde_json::Value, JobFailure>;
}

#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub jobs_completed: u64,
    pub jobs_failed: u64,
}

struct PoolInner {
    queue: Arc<JobQueue>,
    handler: Arc<dyn JobHandler>,
    semaphore: Arc<Semaphore>,
    active: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Owns the pool's shared state. Cheap to clone (an `Arc` underneath);
/// background loops hold a clone to dispatch jobs and read live stats.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn new(queue: Arc<JobQueue>, handler: Arc<dyn JobHandler>, max_concurrency: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                queue,
                handler,
                semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
                active: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    pub fn clone_handle(&self) -> WorkerPool {
        WorkerPool {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            jobs_completed: self.inner.completed.load(Ordering::SeqCst),
            jobs_failed: self.inner.failed.load(Ordering::SeqCst),
        }
    }

    /// Blocks until a slot is free, then spawns the job on its own task.
    /// Never returns an error to the caller: failures are recorded against
    /// the job itself via `queue.fail`.
    pub async fn dispatch(&self, job: Job) {
        let permit = match Arc::clone(&self.inner.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        let inner = Arc::clone(&self.inner);
        let job_id = job.id;

        tokio::spawn(async move {
            inner.active.fetch_add(1, Ordering::SeqCst);

            let result = inner.handler.handle(job).await;

            match result {
                Ok(output) => {
                    if let Err(e) = inner.queue.complete(job_id, output).await {
                        error!(job_id = %job_id, error = %e, "failed to mark job completed");
                    } else {
                        inner.completed.fetch_add(1, Ordering::SeqCst);
                        info!(job_id = %job_id, "job completed");
                    }
                }
                Err(failure) => {
                    let outcome = if failure.retryable {
                        inner.queue.fail(job_id, &failure.message).await
                    } else {
                        inner.queue.fail_terminal(job_id, &failure.message).await
                    };

                    if let Err(e) = outcome {
                        error!(job_id = %job_id, error = %e, "failed to mark job failed");
                    } else {
                        inner.failed.fetch_add(1, Ordering::SeqCst);
                        error!(job_id = %job_id, error = %failure.message, retryable = failure.retryable, "job failed");
                    }
                }
            }

            inner.active.fetch_sub(1, Ordering::SeqCst);
            drop(permit);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobKind;

    #[test]
    fn pool_stats_default_to_zero() {
        let stats = PoolStats::default();
        assert_eq!(stats.jobs_completed, 0);
        assert_eq!(stats.jobs_failed, 0);
    }

    fn sample_job() -> Job {
        Job {
            id: uuid::Uuid::new_v4(),
            kind: JobKind::ResumeIngest,
            status: crate::queue::JobStatus::Processing,
            priority: 0,
            file_bytes: None,
            metadata: serde_json::json!({}),
            correlation_id: None,
            retry_count: 0,
            max_retries: 3,
            scheduled_for: None,
            started_at: None,
            completed_at: None,
            heartbeat_at: None,
            claimed_by: Some("worker-test".to_string()),
            error_message: None,
            result: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn sample_job_round_trips_kind() {
        let job = sample_job();
        assert_eq!(job.kind, JobKind::ResumeIngest);
    }
}
