//! Replace a webhook subscription
//!
//! The body has the same shape as registration; omitted fields take their
//! registration defaults.

use importer_common::error::validate_http_url;
use importer_common::ImporterError;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::create::{default_enabled, default_event_type};
use crate::webhooks::WebhookSubscription;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWebhookCommand {
    #[serde(skip)]
    pub id: i64,
    pub url: String,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateWebhookError {
    #[error(transparent)]
    UrlInvalid(#[from] ImporterError),
    #[error("Event type is required and cannot be empty")]
    EventTypeRequired,
    #[error("Webhook with id {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UpdateWebhookCommand {
    pub fn validate(&self) -> Result<(), UpdateWebhookError> {
        validate_http_url(&self.url)?;
        if self.event_type.trim().is_empty() {
            return Err(UpdateWebhookError::EventTypeRequired);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(id = command.id))]
pub async fn handle(
    pool: PgPool,
    command: UpdateWebhookCommand,
) -> Result<WebhookSubscription, UpdateWebhookError> {
    command.validate()?;

    sqlx::query_as::<_, WebhookSubscription>(
        r#"
        UPDATE webhooks
        SET url = $2, event_type = $3, enabled = $4
        WHERE id = $1
        RETURNING id, url, event_type, enabled
        "#,
    )
    .bind(command.id)
    .bind(command.url.trim())
    .bind(command.event_type.trim())
    .bind(command.enabled)
    .fetch_optional(&pool)
    .await?
    .ok_or(UpdateWebhookError::NotFound(command.id))
}
