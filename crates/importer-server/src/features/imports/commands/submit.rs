//! Submit an import
//!
//! Streams the uploaded body to `<upload_dir>/<job_id>.csv`, seeds the
//! progress slot with `0/0` and enqueues the job. The file belongs to the job
//! from then on; the worker removes it once the job is terminal.

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::features::imports::ImportState;
use crate::ingest::{ImportJob, IngestError, ProgressState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitImportCommand {
    /// Client-side file name, only used to check the extension
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitImportResponse {
    pub job_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitImportError {
    #[error("A multipart field named 'file' is required")]
    FileRequired,
    #[error("Only .csv files are accepted, got '{0}'")]
    NotCsv(String),
    #[error("Failed to read upload: {0}")]
    Upload(String),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to queue import: {0}")]
    Ingest(#[from] IngestError),
}

impl SubmitImportCommand {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), SubmitImportError> {
        let is_csv = Path::new(self.file_name.trim())
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(SubmitImportError::NotCsv(self.file_name.clone()));
        }
        Ok(())
    }
}

#[tracing::instrument(skip(state, command, body), fields(file_name = %command.file_name))]
pub async fn handle<S, E>(
    state: &ImportState,
    command: SubmitImportCommand,
    body: S,
) -> Result<SubmitImportResponse, SubmitImportError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    command.validate()?;

    let job = ImportJob::for_upload(&state.upload_dir);
    let job_id = job.job_id.clone();
    let path = job.source_location.clone();
    tokio::fs::create_dir_all(&state.upload_dir).await?;

    let written = match write_upload(&path, body).await {
        Ok(written) => written,
        Err(e) => {
            discard(&path).await;
            return Err(e);
        },
    };

    let seeded = state
        .progress
        .set(&job_id, &ProgressState::counted(0, 0).encode())
        .await;
    if let Err(e) = seeded {
        discard(&path).await;
        return Err(e.into());
    }

    if let Err(e) = state.queue.enqueue(job).await {
        tracing::error!(job_id = %job_id, error = %e, "Failed to enqueue import");
        discard(&path).await;
        let failed = ProgressState::failed(e.to_string()).encode();
        if let Err(progress_err) = state.progress.set(&job_id, &failed).await {
            tracing::warn!(job_id = %job_id, error = %progress_err, "Failed to record enqueue failure");
        }
        return Err(e.into());
    }

    tracing::info!(job_id = %job_id, bytes = written, "Import queued");

    Ok(SubmitImportResponse { job_id })
}

async fn write_upload<S, E>(path: &Path, body: S) -> Result<u64, SubmitImportError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let mut file = File::create(path).await?;
    let mut body = std::pin::pin!(body);
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| SubmitImportError::Upload(e.to_string()))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload");
    }
}
