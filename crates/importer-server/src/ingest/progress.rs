//! Job progress encoding and storage
//!
//! Progress lives in a single string slot per job id:
//!
//! | State                    | Encoding            |
//! |--------------------------|---------------------|
//! | `Counted { p, t }`       | `"<p>/<t>"`         |
//! | `Completed { p }`        | `"COMPLETED:<p>"`   |
//! | `Failed { message }`     | `"ERROR:<message>"` |
//!
//! A job id with no slot polls as [`ProgressStatus::NotFound`].

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::error::{IngestError, IngestResult};

const COMPLETED_PREFIX: &str = "COMPLETED:";
const ERROR_PREFIX: &str = "ERROR:";

/// Status string returned for unknown job ids
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Progress of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProgressState {
    Counted { processed: u64, total: u64 },
    Completed { processed: u64 },
    Failed { message: String },
}

impl ProgressState {
    pub fn counted(processed: u64, total: u64) -> Self {
        Self::Counted { processed, total }
    }

    pub fn completed(processed: u64) -> Self {
        Self::Completed { processed }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Counted { .. })
    }

    /// Processed count, if the state carries one
    pub fn processed(&self) -> Option<u64> {
        match self {
            Self::Counted { processed, .. } | Self::Completed { processed } => Some(*processed),
            Self::Failed { .. } => None,
        }
    }
}

impl std::fmt::Display for ProgressState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Counted { processed, total } => write!(f, "{}/{}", processed, total),
            Self::Completed { processed } => write!(f, "{}{}", COMPLETED_PREFIX, processed),
            Self::Failed { message } => write!(f, "{}{}", ERROR_PREFIX, message),
        }
    }
}

impl FromStr for ProgressState {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Checked first: the message may itself contain '/' or ':'
        if let Some(message) = s.strip_prefix(ERROR_PREFIX) {
            return Ok(Self::failed(message));
        }

        if let Some(count) = s.strip_prefix(COMPLETED_PREFIX) {
            return count
                .parse()
                .map(Self::completed)
                .map_err(|_| IngestError::InvalidProgress(s.to_string()));
        }

        let (processed, total) = s
            .split_once('/')
            .ok_or_else(|| IngestError::InvalidProgress(s.to_string()))?;
        match (processed.parse(), total.parse()) {
            (Ok(processed), Ok(total)) => Ok(Self::counted(processed, total)),
            _ => Err(IngestError::InvalidProgress(s.to_string())),
        }
    }
}

/// What a poller sees for a job id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStatus {
    NotFound,
    Known(ProgressState),
}

impl ProgressStatus {
    /// Raw slot value, or `NOT_FOUND`
    pub fn encode(&self) -> String {
        match self {
            Self::NotFound => NOT_FOUND.to_string(),
            Self::Known(state) => state.encode(),
        }
    }
}

/// Shared key-value slot per job id
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn set(&self, job_id: &str, value: &str) -> IngestResult<()>;

    async fn get(&self, job_id: &str) -> IngestResult<Option<String>>;
}

/// Read and decode the progress slot for `job_id`
pub async fn poll(store: &dyn ProgressStore, job_id: &str) -> IngestResult<ProgressStatus> {
    match store.get(job_id).await? {
        None => Ok(ProgressStatus::NotFound),
        Some(raw) => Ok(ProgressStatus::Known(raw.parse()?)),
    }
}

/// In-memory progress store that keeps every value written per job
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    slots: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every value written for `job_id`, oldest first
    pub fn history(&self, job_id: &str) -> Vec<String> {
        self.slots
            .lock()
            .ok()
            .and_then(|slots| slots.get(job_id).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn set(&self, job_id: &str, value: &str) -> IngestResult<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| IngestError::Progress("progress lock poisoned".to_string()))?;
        slots
            .entry(job_id.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn get(&self, job_id: &str) -> IngestResult<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| IngestError::Progress("progress lock poisoned".to_string()))?;
        Ok(slots.get(job_id).and_then(|h| h.last().cloned()))
    }
}

/// Progress store backed by the `import_progress` table
#[derive(Clone)]
pub struct PgProgressStore {
    db: PgPool,
}

impl PgProgressStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn set(&self, job_id: &str, value: &str) -> IngestResult<()> {
        sqlx::query(
            r#"
            INSERT INTO import_progress (job_id, status, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (job_id)
            DO UPDATE SET status = EXCLUDED.status, updated_at = NOW()
            "#,
        )
        .bind(job_id)
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get(&self, job_id: &str) -> IngestResult<Option<String>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM import_progress WHERE job_id = $1")
                .bind(job_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(status)
    }
}

/// Writes one job's progress, enforcing monotonic counts and a single
/// terminal state
pub struct ProgressReporter {
    store: Arc<dyn ProgressStore>,
    job_id: String,
    last_processed: Option<u64>,
    terminal: Option<ProgressState>,
}

impl ProgressReporter {
    pub fn new(store: Arc<dyn ProgressStore>, job_id: impl Into<String>) -> Self {
        Self {
            store,
            job_id: job_id.into(),
            last_processed: None,
            terminal: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Terminal state written by this reporter, if any
    pub fn terminal(&self) -> Option<&ProgressState> {
        self.terminal.as_ref()
    }

    /// Write `state` to the store
    ///
    /// Returns `Ok(false)` without writing when the state would move the
    /// processed count backwards or follow a terminal state.
    pub async fn report(&mut self, state: ProgressState) -> IngestResult<bool> {
        if let Some(terminal) = &self.terminal {
            warn!(
                job_id = %self.job_id,
                terminal = %terminal,
                ignored = %state,
                "Ignoring progress after terminal state"
            );
            return Ok(false);
        }

        if let (Some(last), ProgressState::Counted { processed, .. }) = (self.last_processed, &state)
        {
            if *processed < last {
                warn!(
                    job_id = %self.job_id,
                    last,
                    processed,
                    "Ignoring progress regression"
                );
                return Ok(false);
            }
        }

        self.store.set(&self.job_id, &state.encode()).await?;

        if let Some(processed) = state.processed() {
            self.last_processed = Some(processed);
        }
        if state.is_terminal() {
            self.terminal = Some(state);
        }
        Ok(true)
    }
}
