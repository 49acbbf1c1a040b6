//! Send a test event to one subscription
//!
//! The delivery runs in the background; the caller only learns that it was
//! started. Its outcome is logged by the dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::webhooks::{WebhookDispatcher, WebhookSubscription, TEST_EVENT};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestWebhookCommand {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestWebhookResponse {
    pub id: i64,
    pub queued: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TestWebhookError {
    #[error("Webhook with id {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool, dispatcher))]
pub async fn handle(
    pool: PgPool,
    dispatcher: Arc<WebhookDispatcher>,
    command: TestWebhookCommand,
) -> Result<TestWebhookResponse, TestWebhookError> {
    let subscription = sqlx::query_as::<_, WebhookSubscription>(
        "SELECT id, url, event_type, enabled FROM webhooks WHERE id = $1",
    )
    .bind(command.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(TestWebhookError::NotFound(command.id))?;

    tokio::spawn(async move {
        dispatcher
            .deliver_to(&subscription, TEST_EVENT, json!({ "ok": true }))
            .await
    });

    Ok(TestWebhookResponse {
        id: command.id,
        queued: true,
    })
}
