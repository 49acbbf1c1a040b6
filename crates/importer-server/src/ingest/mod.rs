//! CSV ingestion pipeline
//!
//! # Architecture
//!
//! - **reader**: two-pass CSV access (row count, then a forward-only row stream)
//! - **models**: raw rows and the normalized records derived from them
//! - **batch**: in-batch deduplication and batched upsert through a [`RecordSink`]
//! - **sink**: the record sink contract and its Postgres / in-memory backends
//! - **progress**: progress encoding, progress stores and the monotonic reporter
//! - **queue**: the job hand-off between submission and workers
//! - **worker**: drives one job from dequeue to a terminal state
//! - **scheduler**: runs a pool of worker loops over a queue
//!
//! A job moves `Pending -> Counting -> Processing -> Completed | Failed`, with
//! a shortcut from `Counting` straight to `Completed` for files without data
//! rows.

pub mod batch;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod progress;
pub mod queue;
pub mod reader;
pub mod scheduler;
pub mod sink;
pub mod worker;

pub use batch::{dedup_last_write_wins, BatchUpserter};
pub use config::{IngestConfig, WebhookConfig};
pub use error::{IngestError, IngestResult};
pub use jobs::{ImportJob, ImportStats, JobOutcome, JobState};
pub use models::{ImportRecord, ProductAttributes, RawRow};
pub use progress::{
    poll, MemoryProgressStore, PgProgressStore, ProgressReporter, ProgressState, ProgressStatus,
    ProgressStore,
};
pub use queue::{ChannelJobQueue, JobQueue, PgJobQueue};
pub use reader::{CsvSource, RowStream};
pub use scheduler::{JobScheduler, SchedulerHandle};
pub use sink::{MemoryRecordSink, PgRecordSink, RecordSink};
pub use worker::IngestionWorker;
