//! Importer Server Library
//!
//! Asynchronous CSV catalog ingestion.
//!
//! # Overview
//!
//! A client uploads a CSV file and receives a job id. A background worker
//! streams the file, deduplicates rows per batch and upserts them into the
//! `products` table, writing progress that the client polls. When an import
//! completes, enabled webhook subscriptions for `import.completed` are
//! notified.
//!
//! - **ingest**: CSV reader, batch upserter, progress reporter, job queue
//!   and the worker that drives them
//! - **webhooks**: subscription lookup and isolated per-subscriber delivery
//! - **features**: HTTP slices for imports, products and webhook
//!   subscriptions
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use importer_server::ingest::{
//!     ChannelJobQueue, IngestConfig, IngestionWorker, MemoryProgressStore, MemoryRecordSink,
//! };
//! use importer_server::webhooks::{HttpDeliverer, StaticSubscriptions, WebhookDispatcher};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = IngestConfig::default();
//! let dispatcher = WebhookDispatcher::new(
//!     Arc::new(StaticSubscriptions::default()),
//!     Arc::new(HttpDeliverer::new(&config.webhook)?),
//! );
//! let worker = IngestionWorker::new(
//!     Arc::new(MemoryRecordSink::new()),
//!     Arc::new(MemoryProgressStore::new()),
//!     Arc::new(dispatcher),
//!     config,
//! );
//! let queue = ChannelJobQueue::new(16);
//! # let _ = (worker, queue);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod webhooks;

pub use error::{AppError, AppResult};
