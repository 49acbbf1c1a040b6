use sqlx::PgPool;

use crate::webhooks::WebhookSubscription;

#[derive(Debug, thiserror::Error)]
pub enum ListWebhooksError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// All subscriptions, enabled or not, oldest first
#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool) -> Result<Vec<WebhookSubscription>, ListWebhooksError> {
    let subscriptions = sqlx::query_as::<_, WebhookSubscription>(
        "SELECT id, url, event_type, enabled FROM webhooks ORDER BY id",
    )
    .fetch_all(&pool)
    .await?;

    Ok(subscriptions)
}
