//! Job definitions for CSV imports
//!
//! Defines the queued job payload, the job state machine and the statistics
//! a worker collects while running a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::IngestError;
use crate::webhooks::DeliveryOutcome;

/// Import job payload handed from submission to a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    /// Opaque job token, also the progress key
    pub job_id: String,
    /// Uploaded file owned by the job until it finishes
    pub source_location: PathBuf,
}

impl ImportJob {
    pub fn new(job_id: impl Into<String>, source_location: impl Into<PathBuf>) -> Self {
        Self {
            job_id: job_id.into(),
            source_location: source_location.into(),
        }
    }

    /// Fresh job whose upload lives at `<upload_dir>/<job_id>.csv`
    pub fn for_upload(upload_dir: &Path) -> Self {
        let job_id = Uuid::new_v4().to_string();
        let source_location = upload_dir.join(format!("{}.csv", job_id));
        Self::new(job_id, source_location)
    }
}

/// Lifecycle state of an import job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Counting,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Counting => "COUNTING",
            JobState::Processing => "PROCESSING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Counting)
                | (Counting, Processing)
                | (Counting, Completed)
                | (Processing, Completed)
                | (Pending | Counting | Processing, Failed)
        )
    }

    /// Move to `next`, rejecting transitions the state machine does not allow
    pub fn advance(&mut self, next: JobState) -> Result<(), IngestError> {
        if !self.can_transition_to(next) {
            return Err(IngestError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics collected during one import
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImportStats {
    /// Data rows in the file, from the counting pass
    pub total_rows: u64,
    /// Rows read during the streaming pass
    pub rows_read: u64,
    /// Rows dropped because their key was empty
    pub rows_skipped: u64,
    /// Rows collapsed into a later row with the same key in the same batch
    pub duplicates_collapsed: u64,
    /// Distinct records written to the sink
    pub records_upserted: u64,
    /// Batches flushed to the sink
    pub batches_flushed: u64,
    pub duration_secs: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportStats {
    /// Create new stats with the start time set
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark stats as completed
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
        if let (Some(start), Some(end)) = (self.started_at, self.completed_at) {
            self.duration_secs = (end - start).num_milliseconds() as f64 / 1000.0;
        }
    }

    /// Calculate rows read per second
    pub fn rows_per_second(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.rows_read as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Result of running one job to a terminal state
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: String,
    /// Always `Completed` or `Failed`
    pub state: JobState,
    /// Distinct records flushed before the job ended
    pub processed: u64,
    /// Failure message written to the progress store, if any
    pub error: Option<String>,
    pub stats: ImportStats,
    /// Detached `import.completed` fan-out, if one was started
    pub notification: Option<JoinHandle<Vec<DeliveryOutcome>>>,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }
}
