//! Job scheduler
//!
//! Runs `worker_count` loops that pull jobs from a [`JobQueue`] and hand them
//! to an [`IngestionWorker`]. Each loop processes one job at a time, so up to
//! `worker_count` jobs run concurrently.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::IngestConfig;
use super::queue::JobQueue;
use super::worker::IngestionWorker;

/// Job scheduler
pub struct JobScheduler {
    config: IngestConfig,
    worker: Arc<IngestionWorker>,
    queue: Arc<dyn JobQueue>,
}

/// Running scheduler
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    loops: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop taking new jobs and wait for in-flight jobs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.loops {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker loop ended abnormally");
            }
        }
        info!("Job scheduler stopped");
    }
}

impl JobScheduler {
    pub fn new(config: IngestConfig, worker: Arc<IngestionWorker>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            config,
            worker,
            queue,
        }
    }

    /// Spawn the worker loops
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, rx) = watch::channel(false);
        let count = self.config.worker_count.max(1);

        info!(workers = count, batch_size = self.config.batch_size, "Starting job scheduler");

        let loops = (0..count)
            .map(|index| {
                let worker = Arc::clone(&self.worker);
                let queue = Arc::clone(&self.queue);
                let poll_interval = self.config.poll_interval();
                let mut shutdown = rx.clone();

                tokio::spawn(async move {
                    info!(index, "Worker loop started");
                    loop {
                        if *shutdown.borrow() {
                            break;
                        }

                        match queue.dequeue().await {
                            Ok(Some(job)) => {
                                let outcome = worker.process(job.clone()).await;
                                if let Err(e) = queue.acknowledge(&job, outcome.state).await {
                                    warn!(job_id = %job.job_id, error = %e, "Failed to acknowledge job");
                                }
                                continue;
                            }
                            Ok(None) => {}
                            Err(e) => warn!(error = %e, "Failed to dequeue job"),
                        }

                        tokio::select! {
                            _ = tokio::time::sleep(poll_interval) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                    info!(index, "Worker loop stopped");
                })
            })
            .collect();

        SchedulerHandle { shutdown, loops }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::progress::MemoryProgressStore;
    use crate::ingest::queue::ChannelJobQueue;
    use crate::ingest::sink::MemoryRecordSink;
    use crate::ingest::ImportJob;
    use crate::webhooks::{HttpDeliverer, StaticSubscriptions, WebhookDispatcher};
    use std::time::Duration;

    #[tokio::test]
    async fn test_processes_queued_jobs_and_stops() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = Arc::new(MemoryRecordSink::new());
        let progress = Arc::new(MemoryProgressStore::new());
        let mut config = IngestConfig::default();
        config.poll_interval_ms = 10;

        let dispatcher = WebhookDispatcher::new(
            Arc::new(StaticSubscriptions::default()),
            Arc::new(HttpDeliverer::new(&config.webhook).unwrap()),
        );
        let worker = Arc::new(IngestionWorker::new(
            sink.clone(),
            progress.clone(),
            Arc::new(dispatcher),
            config.clone(),
        ));
        let queue = Arc::new(ChannelJobQueue::new(8));

        for i in 0..3 {
            let path = dir.path().join(format!("{}.csv", i));
            std::fs::write(&path, format!("sku\nitem-{}\n", i)).unwrap();
            queue.enqueue(ImportJob::new(format!("job-{}", i), path)).await.unwrap();
        }

        let handle = JobScheduler::new(config, worker, queue.clone()).start();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while sink.len() < 3 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown().await;

        assert_eq!(sink.len(), 3);
        for i in 0..3 {
            let history = progress.history(&format!("job-{}", i));
            assert_eq!(history.last().map(String::as_str), Some("COMPLETED:1"));
        }
        assert!(queue.is_empty());
    }
}
