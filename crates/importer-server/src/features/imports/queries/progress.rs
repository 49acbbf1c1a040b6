//! Import progress query

use serde::{Deserialize, Serialize};

use crate::features::imports::ImportState;
use crate::ingest::{poll, IngestError, ProgressState, ProgressStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProgressQuery {
    pub job_id: String,
}

/// Raw progress encoding plus a decoded view of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgressView {
    /// `"<p>/<t>"`, `"COMPLETED:<p>"`, `"ERROR:<msg>"` or `"NOT_FOUND"`
    pub status: String,
    /// `counted`, `completed`, `failed` or `not_found`
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ProgressStatus> for ImportProgressView {
    fn from(status: ProgressStatus) -> Self {
        let encoded = status.encode();
        match status {
            ProgressStatus::NotFound => Self {
                status: encoded,
                state: "not_found".to_string(),
                processed: None,
                total: None,
                message: None,
            },
            ProgressStatus::Known(ProgressState::Counted { processed, total }) => Self {
                status: encoded,
                state: "counted".to_string(),
                processed: Some(processed),
                total: Some(total),
                message: None,
            },
            ProgressStatus::Known(ProgressState::Completed { processed }) => Self {
                status: encoded,
                state: "completed".to_string(),
                processed: Some(processed),
                total: None,
                message: None,
            },
            ProgressStatus::Known(ProgressState::Failed { message }) => Self {
                status: encoded,
                state: "failed".to_string(),
                processed: None,
                total: None,
                message: Some(message),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportProgressError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

#[tracing::instrument(skip(state))]
pub async fn handle(
    state: &ImportState,
    query: ImportProgressQuery,
) -> Result<ImportProgressView, ImportProgressError> {
    let status = poll(state.progress.as_ref(), &query.job_id).await?;
    Ok(status.into())
}
