//! Ingestion configuration
//!
//! Configuration for import workers and webhook delivery (INGEST_* and
//! WEBHOOK_* environment variables).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::env_or;
use importer_common::ImporterError;

/// Default number of records per upsert batch.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Upper bound for the batch size.
///
/// Each record binds five parameters and Postgres caps a statement at 65535.
pub const MAX_BATCH_SIZE: usize = 13_000;

/// Default number of concurrent worker loops.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Default directory uploaded files are written to before import.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default delay between queue polls when no job is available.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default per-attempt webhook timeout.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 5;

/// Default number of response body characters kept per delivery.
pub const DEFAULT_BODY_EXCERPT_LEN: usize = 300;

/// Main ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Whether worker loops are started with the server
    pub enabled: bool,
    /// Number of jobs processed concurrently
    pub worker_count: usize,
    /// Maximum records per upsert batch
    pub batch_size: usize,
    /// Where uploaded CSV files are stored until their job finishes
    pub upload_dir: PathBuf,
    /// Queue poll interval when idle, in milliseconds
    pub poll_interval_ms: u64,
    /// Fire `import.completed` for imports without data rows
    pub notify_on_empty: bool,
    pub webhook: WebhookConfig,
}

/// Outbound webhook delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Hard timeout for one delivery attempt, in seconds
    pub timeout_secs: u64,
    /// Response body characters kept in the delivery outcome
    pub body_excerpt_len: usize,
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load webhook configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            timeout_secs: env_or("WEBHOOK_TIMEOUT_SECS", DEFAULT_WEBHOOK_TIMEOUT_SECS),
            body_excerpt_len: env_or("WEBHOOK_BODY_EXCERPT_LEN", DEFAULT_BODY_EXCERPT_LEN),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
            body_excerpt_len: DEFAULT_BODY_EXCERPT_LEN,
        }
    }
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: env_or("INGEST_ENABLED", true),
            worker_count: env_or("INGEST_WORKER_COUNT", DEFAULT_WORKER_COUNT),
            batch_size: env_or("INGEST_BATCH_SIZE", DEFAULT_BATCH_SIZE),
            upload_dir: std::env::var("INGEST_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            poll_interval_ms: env_or("INGEST_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            notify_on_empty: env_or("INGEST_NOTIFY_EMPTY", false),
            webhook: WebhookConfig::from_env(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_upload_dir(mut self, upload_dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = upload_dir.into();
        self
    }

    pub fn with_notify_on_empty(mut self, notify: bool) -> Self {
        self.notify_on_empty = notify;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ImporterError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ImporterError::config(format!(
                "INGEST_BATCH_SIZE must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        if self.worker_count == 0 {
            return Err(ImporterError::config("INGEST_WORKER_COUNT must be at least 1"));
        }
        if self.webhook.timeout_secs == 0 {
            return Err(ImporterError::config("WEBHOOK_TIMEOUT_SECS must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_count: DEFAULT_WORKER_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            notify_on_empty: false,
            webhook: WebhookConfig::default(),
        }
    }
}
