//! Register a webhook subscription

use importer_common::error::validate_http_url;
use importer_common::ImporterError;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::webhooks::{WebhookSubscription, IMPORT_COMPLETED};

pub(crate) fn default_event_type() -> String {
    IMPORT_COMPLETED.to_string()
}

pub(crate) fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWebhookCommand {
    pub url: String,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateWebhookError {
    #[error(transparent)]
    UrlInvalid(#[from] ImporterError),
    #[error("Event type is required and cannot be empty")]
    EventTypeRequired,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CreateWebhookCommand {
    pub fn validate(&self) -> Result<(), CreateWebhookError> {
        validate_http_url(&self.url)?;
        if self.event_type.trim().is_empty() {
            return Err(CreateWebhookError::EventTypeRequired);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(event_type = %command.event_type))]
pub async fn handle(
    pool: PgPool,
    command: CreateWebhookCommand,
) -> Result<WebhookSubscription, CreateWebhookError> {
    command.validate()?;

    let subscription = sqlx::query_as::<_, WebhookSubscription>(
        r#"
        INSERT INTO webhooks (url, event_type, enabled)
        VALUES ($1, $2, $3)
        RETURNING id, url, event_type, enabled
        "#,
    )
    .bind(command.url.trim())
    .bind(command.event_type.trim())
    .bind(command.enabled)
    .fetch_one(&pool)
    .await?;

    Ok(subscription)
}
