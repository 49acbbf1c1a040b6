//! Delete product commands

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteProductCommand {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteProductResponse {
    pub id: i64,
    pub deleted: bool,
}

/// Removes every product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteAllProductsCommand;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAllProductsResponse {
    pub deleted: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteProductError {
    #[error("Product with id {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    command: DeleteProductCommand,
) -> Result<DeleteProductResponse, DeleteProductError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(command.id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DeleteProductError::NotFound(command.id));
    }

    Ok(DeleteProductResponse {
        id: command.id,
        deleted: true,
    })
}

#[tracing::instrument(skip(pool, _command))]
pub async fn handle_all(
    pool: PgPool,
    _command: DeleteAllProductsCommand,
) -> Result<DeleteAllProductsResponse, DeleteProductError> {
    let result = sqlx::query("DELETE FROM products").execute(&pool).await?;

    tracing::warn!(deleted = result.rows_affected(), "Deleted all products");

    Ok(DeleteAllProductsResponse {
        deleted: result.rows_affected(),
    })
}
