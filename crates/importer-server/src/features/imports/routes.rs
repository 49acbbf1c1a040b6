//! Import API routes
//!
//! - `POST /api/v1/imports/upload` - Upload a CSV file (multipart field `file`)
//! - `GET /api/v1/imports/progress/:job_id` - Poll import progress

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::{
    commands::{SubmitImportCommand, SubmitImportError},
    queries::{ImportProgressError, ImportProgressQuery},
    ImportState,
};

pub fn imports_routes() -> Router<ImportState> {
    Router::new()
        // Catalogs are streamed to disk, so the default 2 MB cap does not apply
        .route("/upload", post(upload_import).layer(DefaultBodyLimit::disable()))
        .route("/progress/:job_id", get(import_progress))
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_import(
    State(state): State<ImportState>,
    mut multipart: Multipart,
) -> Result<Response, ImportApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SubmitImportError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let command = SubmitImportCommand::new(file_name);
        let response = super::commands::submit::handle(&state, command, field).await?;

        return Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(response))).into_response());
    }

    Err(SubmitImportError::FileRequired.into())
}

#[tracing::instrument(skip(state))]
async fn import_progress(
    State(state): State<ImportState>,
    Path(job_id): Path<String>,
) -> Result<Response, ImportApiError> {
    let view = super::queries::progress::handle(&state, ImportProgressQuery { job_id }).await?;
    Ok(ApiResponse::success(view).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
enum ImportApiError {
    #[error(transparent)]
    Submit(#[from] SubmitImportError),
    #[error(transparent)]
    Progress(#[from] ImportProgressError),
}

impl IntoResponse for ImportApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ImportApiError::Submit(SubmitImportError::FileRequired)
            | ImportApiError::Submit(SubmitImportError::NotCsv(_))
            | ImportApiError::Submit(SubmitImportError::Upload(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            },
            ImportApiError::Submit(SubmitImportError::Io(_))
            | ImportApiError::Submit(SubmitImportError::Ingest(_)) => {
                tracing::error!(error = %self, "Failed to accept import");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            },
            ImportApiError::Progress(_) => {
                tracing::error!(error = %self, "Failed to read import progress");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            },
        };

        ErrorResponse::new(code, self.to_string()).into_response_with(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ChannelJobQueue, MemoryProgressStore, ProgressStore};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-IMPORT-BOUNDARY";

    fn multipart_request(file_name: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = file_name,
            c = contents
        );
        Request::post("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn state(dir: &std::path::Path) -> (ImportState, Arc<MemoryProgressStore>, Arc<ChannelJobQueue>) {
        let progress = Arc::new(MemoryProgressStore::new());
        let queue = Arc::new(ChannelJobQueue::new(8));
        let state = ImportState {
            progress: progress.clone(),
            queue: queue.clone(),
            upload_dir: dir.to_path_buf(),
        };
        (state, progress, queue)
    }

    #[tokio::test]
    async fn test_upload_returns_job_id() {
        let dir = tempfile::tempdir().unwrap();
        let (state, progress, queue) = state(dir.path());
        let app = imports_routes().with_state(state);

        let response = app
            .oneshot(multipart_request("catalog.csv", "sku,name\na,Alpha"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        let job_id = body["data"]["job_id"].as_str().unwrap().to_string();
        assert_eq!(progress.get(&job_id).await.unwrap().as_deref(), Some("0/0"));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_larger_than_default_body_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _, queue) = state(dir.path());
        let app = imports_routes().with_state(state);

        let mut csv = String::from("sku,name\n");
        let mut i = 0;
        while csv.len() < 3 * 1024 * 1024 {
            csv.push_str(&format!("sku-{:08},Product number {:08}\n", i, i));
            i += 1;
        }

        let response = app
            .oneshot(multipart_request("big.csv", &csv))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(queue.len(), 1);
        let body = json_body(response).await;
        let job_id = body["data"]["job_id"].as_str().unwrap();
        let stored = std::fs::metadata(dir.path().join(format!("{}.csv", job_id))).unwrap();
        assert_eq!(stored.len(), csv.len() as u64);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_csv() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _, queue) = state(dir.path());
        let app = imports_routes().with_state(state);

        let response = app
            .oneshot(multipart_request("catalog.json", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_progress_for_unknown_job() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _, _) = state(dir.path());
        let app = imports_routes().with_state(state);

        let response = app
            .oneshot(Request::get("/progress/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["status"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_progress_reports_raw_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let (state, progress, _) = state(dir.path());
        progress.set("job-1", "COMPLETED:42").await.unwrap();
        let app = imports_routes().with_state(state);

        let response = app
            .oneshot(Request::get("/progress/job-1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["data"]["status"], "COMPLETED:42");
        assert_eq!(body["data"]["state"], "completed");
        assert_eq!(body["data"]["processed"], 42);
    }
}
