//! Job hand-off between submission and workers
//!
//! Submission enqueues an [`ImportJob`]; a worker dequeues it and owns it
//! until it acknowledges a terminal state. `dequeue` never blocks: an empty
//! queue yields `None` and the caller decides how long to wait.

use async_trait::async_trait;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::error::{IngestError, IngestResult};
use super::jobs::{ImportJob, JobState};

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: ImportJob) -> IngestResult<()>;

    /// Claim the next job, if any
    async fn dequeue(&self) -> IngestResult<Option<ImportJob>>;

    /// Record the terminal state of a dequeued job
    async fn acknowledge(&self, _job: &ImportJob, _state: JobState) -> IngestResult<()> {
        Ok(())
    }
}

/// In-process bounded queue
///
/// Each job is received by exactly one caller of `dequeue`.
pub struct ChannelJobQueue {
    sender: mpsc::Sender<ImportJob>,
    receiver: Mutex<mpsc::Receiver<ImportJob>>,
}

impl ChannelJobQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Jobs waiting to be dequeued
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobQueue for ChannelJobQueue {
    async fn enqueue(&self, job: ImportJob) -> IngestResult<()> {
        self.sender
            .send(job)
            .await
            .map_err(|e| IngestError::Queue(format!("queue closed, dropped job {}", e.0.job_id)))
    }

    async fn dequeue(&self) -> IngestResult<Option<ImportJob>> {
        let mut receiver = self
            .receiver
            .lock()
            .map_err(|_| IngestError::Queue("receiver lock poisoned".to_string()))?;
        match receiver.try_recv() {
            Ok(job) => Ok(Some(job)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(IngestError::Queue("queue disconnected".to_string()))
            }
        }
    }
}

/// Queue backed by the `import_jobs` table
///
/// Claims use `FOR UPDATE SKIP LOCKED`, so concurrent workers, in this
/// process or others, never receive the same job. A claimed job records the
/// claiming host and time; jobs left claimed by a dead worker are not
/// reclaimed automatically.
#[derive(Clone)]
pub struct PgJobQueue {
    db: PgPool,
    hostname: String,
}

impl PgJobQueue {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            hostname: hostname::get()
                .unwrap_or_else(|_| "unknown".into())
                .to_string_lossy()
                .to_string(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: ImportJob) -> IngestResult<()> {
        sqlx::query(
            r#"
            INSERT INTO import_jobs (job_id, source_location, status)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&job.job_id)
        .bind(job.source_location.to_string_lossy().as_ref())
        .bind(JobState::Pending.as_str())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn dequeue(&self) -> IngestResult<Option<ImportJob>> {
        let claimed: Option<(String, String)> = sqlx::query_as(
            r#"
            UPDATE import_jobs
            SET status = $1, worker_hostname = $2, claimed_at = NOW()
            WHERE job_id = (
                SELECT job_id FROM import_jobs
                WHERE status = $3
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING job_id, source_location
            "#,
        )
        .bind(JobState::Counting.as_str())
        .bind(&self.hostname)
        .bind(JobState::Pending.as_str())
        .fetch_optional(&self.db)
        .await?;

        Ok(claimed.map(|(job_id, source_location)| {
            debug!(job_id = %job_id, hostname = %self.hostname, "Claimed import job");
            ImportJob::new(job_id, PathBuf::from(source_location))
        }))
    }

    async fn acknowledge(&self, job: &ImportJob, state: JobState) -> IngestResult<()> {
        sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = $2, finished_at = NOW()
            WHERE job_id = $1
            "#,
        )
        .bind(&job.job_id)
        .bind(state.as_str())
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
