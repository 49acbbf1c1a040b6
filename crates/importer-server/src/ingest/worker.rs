//! Import worker
//!
//! Drives one job from dequeue to a terminal state:
//!
//! 1. count data rows, report `0/<total>`
//! 2. stream rows, map them to records, flush batches, report after each flush
//! 3. report `COMPLETED:<n>` or `ERROR:<message>`
//! 4. delete the uploaded file
//! 5. start the `import.completed` fan-out, detached from the job
//!
//! [`IngestionWorker::process`] is the only place job errors are handled.
//! Whatever happens inside the job, including a panic, ends as a terminal
//! progress value and the worker keeps running.

use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::batch::BatchUpserter;
use super::config::IngestConfig;
use super::error::{IngestError, IngestResult};
use super::jobs::{ImportJob, ImportStats, JobOutcome, JobState};
use super::models::ImportRecord;
use super::progress::{ProgressReporter, ProgressState, ProgressStore};
use super::reader::CsvSource;
use super::sink::RecordSink;
use crate::webhooks::{WebhookDispatcher, IMPORT_COMPLETED};

/// Mutable state of one job execution
struct JobRun {
    reporter: ProgressReporter,
    state: JobState,
    stats: ImportStats,
}

/// Executes import jobs against injected collaborators
pub struct IngestionWorker {
    worker_id: Uuid,
    sink: Arc<dyn RecordSink>,
    progress: Arc<dyn ProgressStore>,
    dispatcher: Arc<WebhookDispatcher>,
    config: IngestConfig,
}

impl IngestionWorker {
    pub fn new(
        sink: Arc<dyn RecordSink>,
        progress: Arc<dyn ProgressStore>,
        dispatcher: Arc<WebhookDispatcher>,
        config: IngestConfig,
    ) -> Self {
        Self {
            worker_id: Uuid::new_v4(),
            sink,
            progress,
            dispatcher,
            config,
        }
    }

    pub fn worker_id(&self) -> Uuid {
        self.worker_id
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run `job` to a terminal state
    #[tracing::instrument(skip(self, job), fields(job_id = %job.job_id, worker_id = %self.worker_id))]
    pub async fn process(&self, job: ImportJob) -> JobOutcome {
        let mut run = JobRun {
            reporter: ProgressReporter::new(Arc::clone(&self.progress), job.job_id.clone()),
            state: JobState::Pending,
            stats: ImportStats::new(),
        };

        let result = AssertUnwindSafe(self.execute(&job, &mut run))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(IngestError::Panicked));

        let processed = run.stats.records_upserted;
        let (terminal, error_message) = match result {
            Ok(()) => (ProgressState::completed(processed), None),
            Err(e) => {
                error!(error = %e, processed, "Import failed");
                let message = e.to_string();
                (ProgressState::failed(message.clone()), Some(message))
            }
        };
        let final_state = if error_message.is_none() {
            JobState::Completed
        } else {
            JobState::Failed
        };

        if let Err(e) = run.reporter.report(terminal).await {
            error!(error = %e, "Failed to write terminal progress");
        }
        if let Err(e) = run.state.advance(final_state) {
            warn!(error = %e, "Unexpected job state transition");
            run.state = final_state;
        }

        remove_source(&job).await;
        run.stats.complete();

        info!(
            state = %run.state,
            processed,
            rows_read = run.stats.rows_read,
            rows_skipped = run.stats.rows_skipped,
            duplicates = run.stats.duplicates_collapsed,
            batches = run.stats.batches_flushed,
            duration_secs = run.stats.duration_secs,
            rows_per_second = run.stats.rows_per_second(),
            "Import finished"
        );

        let notification = if run.state == JobState::Completed
            && (run.stats.total_rows > 0 || self.config.notify_on_empty)
        {
            let dispatcher = Arc::clone(&self.dispatcher);
            let data = json!({ "job_id": job.job_id, "rows": processed });
            Some(tokio::spawn(async move {
                dispatcher.fire(IMPORT_COMPLETED, data).await
            }))
        } else {
            None
        };

        JobOutcome {
            job_id: job.job_id,
            state: run.state,
            processed,
            error: error_message,
            stats: run.stats,
            notification,
        }
    }

    async fn execute(&self, job: &ImportJob, run: &mut JobRun) -> IngestResult<()> {
        run.state.advance(JobState::Counting)?;
        let source = CsvSource::new(&job.source_location);

        let total = source.count_rows().await?;
        run.stats.total_rows = total;
        if total == 0 {
            info!("No data rows, completing without touching the sink");
            return Ok(());
        }

        run.reporter.report(ProgressState::counted(0, total)).await?;
        run.state.advance(JobState::Processing)?;

        let mut rows = source.open().await?;
        let mut upserter = BatchUpserter::new(self.sink.as_ref(), self.config.batch_size);

        let result: IngestResult<()> = async {
            while let Some(row) = rows.next_row().await {
                let row = row?;
                run.stats.rows_read += 1;

                let Some(record) = ImportRecord::from_row(&row)? else {
                    run.stats.rows_skipped += 1;
                    continue;
                };

                if let Some(processed) = upserter.push(record).await? {
                    run.reporter
                        .report(ProgressState::counted(processed, total))
                        .await?;
                }
            }

            if let Some(processed) = upserter.finish().await? {
                run.reporter
                    .report(ProgressState::counted(processed, total))
                    .await?;
            }
            Ok(())
        }
        .await;

        run.stats.records_upserted = upserter.processed();
        run.stats.duplicates_collapsed = upserter.duplicates_collapsed();
        run.stats.batches_flushed = upserter.batches_flushed();
        result
    }
}

/// Best-effort removal of the job's uploaded file
async fn remove_source(job: &ImportJob) {
    if let Err(e) = tokio::fs::remove_file(&job.source_location).await {
        warn!(
            path = %job.source_location.display(),
            error = %e,
            "Failed to remove uploaded file"
        );
    }
}
