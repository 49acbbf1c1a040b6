//! End-to-end import through the HTTP surface with in-memory backends
//!
//! Upload a CSV, let the scheduler pick it up, poll progress to completion
//! and check both the stored records and the webhook delivery.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{init_test_tracing, wait_for};
use importer_server::api::create_router;
use importer_server::config::CorsConfig;
use importer_server::features::{imports::ImportState, FeatureState};
use importer_server::ingest::{
    ChannelJobQueue, IngestConfig, IngestionWorker, JobScheduler, MemoryProgressStore,
    MemoryRecordSink, SchedulerHandle,
};
use importer_server::webhooks::{
    HttpDeliverer, StaticSubscriptions, WebhookDispatcher, WebhookSubscription, IMPORT_COMPLETED,
};

const BOUNDARY: &str = "pipeline-boundary";

struct Pipeline {
    app: Router,
    sink: Arc<MemoryRecordSink>,
    scheduler: SchedulerHandle,
}

fn start_pipeline(upload_dir: &Path, subscriptions: Vec<WebhookSubscription>) -> Pipeline {
    let config = IngestConfig {
        poll_interval_ms: 10,
        ..IngestConfig::default()
    }
    .with_batch_size(2)
    .with_upload_dir(upload_dir);

    let sink = Arc::new(MemoryRecordSink::new());
    let progress = Arc::new(MemoryProgressStore::new());
    let queue = Arc::new(ChannelJobQueue::new(16));
    let dispatcher = Arc::new(WebhookDispatcher::new(
        Arc::new(StaticSubscriptions::new(subscriptions)),
        Arc::new(HttpDeliverer::new(&config.webhook).unwrap()),
    ));

    let worker = IngestionWorker::new(
        sink.clone(),
        progress.clone(),
        dispatcher.clone(),
        config.clone(),
    );
    let scheduler = JobScheduler::new(config.clone(), Arc::new(worker), queue.clone()).start();

    // Never connected: only the database-backed routes would use it
    let db = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgresql://postgres@127.0.0.1:1/unused")
        .unwrap();

    let state = FeatureState {
        db,
        imports: ImportState {
            progress,
            queue,
            upload_dir: config.upload_dir.clone(),
        },
        dispatcher,
    };
    let cors = CorsConfig {
        allowed_origins: Vec::new(),
        allow_credentials: false,
    };

    Pipeline {
        app: create_router(state, &cors),
        sink,
        scheduler,
    }
}

fn upload_request(file_name: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = file_name,
        c = contents
    );
    Request::post("/api/v1/imports/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn upload(app: &Router, file_name: &str, contents: &str) -> String {
    let (status, body) = json(app, upload_request(file_name, contents)).await;
    assert_eq!(status, StatusCode::ACCEPTED, "upload failed: {}", body);
    body["data"]["job_id"].as_str().unwrap().to_string()
}

async fn wait_for_terminal(app: &Router, job_id: &str) -> String {
    wait_for(Duration::from_secs(10), move || async move {
        let request = Request::get(format!("/api/v1/imports/progress/{}", job_id))
            .body(Body::empty())
            .unwrap();
        let (_, body) = json(app, request).await;
        let status = body["data"]["status"].as_str().unwrap_or_default().to_string();
        (status.starts_with("COMPLETED:") || status.starts_with("ERROR:")).then_some(status)
    })
    .await
}

#[tokio::test]
async fn test_upload_to_completion_with_webhook() {
    init_test_tracing();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let pipeline = start_pipeline(
        dir.path(),
        vec![WebhookSubscription::new(
            1,
            format!("{}/hook", server.uri()),
            IMPORT_COMPLETED,
        )],
    );

    let csv = "sku,name,price\nA-1,Anvil,10\nb-2,Bolt,0.5\na-1,Anvil v2,20\nc-3,Cog,\n";
    let job_id = upload(&pipeline.app, "catalog.csv", csv).await;

    let status = wait_for_terminal(&pipeline.app, &job_id).await;
    assert!(status.starts_with("COMPLETED:"), "unexpected status {}", status);

    let stored = pipeline.sink.snapshot();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored["c-3"].price, None);
    assert_eq!(stored["b-2"].name.as_deref(), Some("Bolt"));
    // Last write wins, whether the duplicate landed in the same batch or a later one
    assert_eq!(stored["a-1"].price, Some(20.0));

    let server = &server;
    let requests = wait_for(Duration::from_secs(5), move || async move {
        let requests = server.received_requests().await.unwrap_or_default();
        (!requests.is_empty()).then_some(requests)
    })
    .await;
    let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(payload["event"], IMPORT_COMPLETED);
    assert_eq!(payload["data"]["job_id"], job_id.as_str());

    // The upload belongs to the job and is gone once it finishes
    let leftover = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftover, 0);

    pipeline.scheduler.shutdown().await;
}

#[tokio::test]
async fn test_bad_price_fails_job_and_keeps_worker_alive() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    let pipeline = start_pipeline(dir.path(), Vec::new());

    let bad = upload(&pipeline.app, "bad.csv", "sku,price\nx,1\ny,lots\n").await;
    let status = wait_for_terminal(&pipeline.app, &bad).await;
    assert!(status.starts_with("ERROR:"), "unexpected status {}", status);
    assert!(status.contains("lots"));

    // The next job on the same workers still succeeds
    let good = upload(&pipeline.app, "good.csv", "sku,price\nz,3\n").await;
    let status = wait_for_terminal(&pipeline.app, &good).await;
    assert_eq!(status, "COMPLETED:1");
    assert!(pipeline.sink.get("z").is_some());

    pipeline.scheduler.shutdown().await;
}

#[tokio::test]
async fn test_header_only_file_completes_with_zero() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = start_pipeline(dir.path(), Vec::new());

    let job_id = upload(&pipeline.app, "empty.csv", "sku,name\n").await;
    let status = wait_for_terminal(&pipeline.app, &job_id).await;

    assert_eq!(status, "COMPLETED:0");
    assert!(pipeline.sink.is_empty());

    pipeline.scheduler.shutdown().await;
}

#[tokio::test]
async fn test_unknown_job_polls_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = start_pipeline(dir.path(), Vec::new());

    let request = Request::get("/api/v1/imports/progress/does-not-exist")
        .body(Body::empty())
        .unwrap();
    let (status, body) = json(&pipeline.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "NOT_FOUND");

    pipeline.scheduler.shutdown().await;
}
