//! Background scheduler: durable job dispatch, stale-job recovery, daily
//! cleanup and periodic metrics, running as four concurrent loops over a
//! bounded worker pool.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                      │   Producer   │
//!                      │  (CLI/API)   │
//!                      └──────┬───────┘
//!                             │
//!                      ┌──────▼───────┐
//!                      │  job_queue   │
//!                      │ (PostgreSQL) │
//!                      └──────┬───────┘
//!                             │
//!         ┌────────────┬──────┴──────┬────────────┐
//!         ▼            ▼             ▼            ▼
//!    ┌─────────┐  ┌──────────┐  ┌─────────┐  ┌──────────┐
//!    │Dispatch │  │  Stale   │  │ Cleanup │  │ Metrics  │
//!    │  loop   │  │ detector │  │  (02:00)│  │ emitter  │
//!    └────┬────┘  └──────────┘  └─────────┘  └──────────┘
//!         │
//!         ▼
//!    ┌─────────────────────┐
//!    │  bounded worker pool │
//!    └─────────────────────┘
//! ```
//!
//! - **Dispatch loop**: claims ready jobs every `poll_interval` (first run
//!   after `initial_delay`) and hands them to the worker pool.
//! - **Stale detector**: every `stale_check_interval`, requeues jobs whose
//!   heartbeat is older than `stale_threshold`.
//! - **Cleaner**: runs once a day at `cleanup_hour_local` local time,
//!   deleting terminal jobs older than 30 days.
//! - **Metrics emitter**: logs queue depth and pool utilization every
//!   `metrics_interval`.

pub mod worker_pool;

pub use worker_pool::{JobFailure, JobHandler, PoolError, PoolStats, WorkerPool};

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::queue::{JobQueue, QueueError};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Owns the four background loops and the worker pool; `shutdown()` signals
/// all of them via a shared broadcast channel.
pub struct Scheduler {
    config: SchedulerConfig,
    queue: Arc<JobQueue>,
    pool: WorkerPool,
    shutdown_tx: broadcast::Sender<()>,
    loop_handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, queue: Arc<JobQueue>, handler: Arc<dyn JobHandler>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        let pool = WorkerPool::new(Arc::clone(&queue), handler, config.batch_size);

        Self {
            config,
            queue,
            pool,
            shutdown_tx,
            loop_handles: Vec::new(),
        }
    }

    /// Spawns the dispatch loop, stale detector, daily cleaner and metrics
    /// emitter. Returns immediately; loops run until [`Scheduler::shutdown`].
    pub fn start(&mut self) {
        self.loop_handles.push(self.spawn_dispatch_loop());
        self.loop_handles.push(self.spawn_stale_loop());
        self.loop_handles.push(self.spawn_cleanup_loop());
        self.loop_handles.push(self.spawn_metrics_loop());

        info!(worker_id = %self.config.worker_id, "scheduler started");
    }

    fn spawn_dispatch_loop(&self) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let pool = self.pool.clone_handle();
        let worker_id = self.config.worker_id.clone();
        let poll_interval = self.config.poll_interval;
        let initial_delay = self.config.initial_delay;
        let batch_size = self.config.batch_size as i64;
        let dispatch_kinds = self.config.dispatch_kinds.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            let mut ticker = tokio::time::interval(poll_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for kind in &dispatch_kinds {
                            match queue.claim(*kind, &worker_id, batch_size).await {
                                Ok(jobs) => {
                                    for job in jobs {
                                        pool.dispatch(job).await;
                                    }
                                }
                                Err(e) => error!(error = %e, kind = kind.as_str(), "dispatch claim failed"),
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("dispatch loop shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn spawn_stale_loop(&self) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let interval = self.config.stale_check_interval;
        let threshold = self.config.stale_threshold;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match queue.reset_stale(threshold).await {
                            Ok(0) => {}
                            Ok(n) => warn!(recovered = n, "recovered stale jobs"),
                            Err(e) => error!(error = %e, "stale sweep failed"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("stale detector shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn spawn_cleanup_loop(&self) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let cleanup_hour = self.config.cleanup_hour_local;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                let sleep_for = duration_until_next_hour(cleanup_hour);
                tokio::select! {
                    _ = tokio::time::sleep(sleep_for) => {
                        match queue.delete_completed_older_than(Duration::from_secs(30 * 24 * 3600)).await {
                            Ok(n) => info!(deleted = n, "daily cleanup complete"),
                            Err(e) => error!(error = %e, "daily cleanup failed"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("cleaner shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn spawn_metrics_loop(&self) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let pool = self.pool.clone_handle();
        let interval = self.config.metrics_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match queue.queue_depth(None).await {
                            Ok(depth) => info!(
                                queue_depth = depth,
                                active_workers = pool.active_count(),
                                "scheduler metrics"
                            ),
                            Err(e) => error!(error = %e, "metrics query failed"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("metrics emitter shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Signals every loop to stop and waits for them to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(());
        for handle in self.loop_handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "scheduler loop panicked during shutdown");
            }
        }
        info!("scheduler shutdown complete");
    }
}

/// Seconds until the next local-time occurrence of `hour:00`. If `hour` has
/// already passed today, returns the delay until tomorrow.
fn duration_until_next_hour(hour: u32) -> Duration {
    let now = Local::now();
    let mut target = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("valid hour")
        .and_local_timezone(Local)
        .single()
        .unwrap_or(now);

    if target <= now {
        target += chrono::Duration::days(1);
    }

    (target - now).to_std().unwrap_or(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_hour_delay_is_positive_and_bounded() {
        let delay = duration_until_next_hour(2);
        assert!(delay.as_secs() > 0);
        assert!(delay.as_secs() <= 24 * 3600);
    }
}
