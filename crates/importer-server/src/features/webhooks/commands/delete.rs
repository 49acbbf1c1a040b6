use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteWebhookCommand {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteWebhookResponse {
    pub id: i64,
    pub deleted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteWebhookError {
    #[error("Webhook with id {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    command: DeleteWebhookCommand,
) -> Result<DeleteWebhookResponse, DeleteWebhookError> {
    let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
        .bind(command.id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DeleteWebhookError::NotFound(command.id));
    }

    Ok(DeleteWebhookResponse {
        id: command.id,
        deleted: true,
    })
}
