//! Update product command
//!
//! Reads the product under a row lock, merges the patch over it with
//! [`ProductPatch::apply`] and writes every column back.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::products::types::{Product, ProductPatch};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProductCommand {
    #[serde(skip)]
    pub id: i64,
    #[serde(flatten)]
    pub patch: ProductPatch,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateProductError {
    #[error("At least one field must be provided for update")]
    NoFieldsToUpdate,
    #[error("Price must be a finite number")]
    PriceInvalid,
    #[error("Product with id {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UpdateProductCommand {
    pub fn validate(&self) -> Result<(), UpdateProductError> {
        if self.patch.is_empty() {
            return Err(UpdateProductError::NoFieldsToUpdate);
        }
        if matches!(self.patch.price, Some(Some(p)) if !p.is_finite()) {
            return Err(UpdateProductError::PriceInvalid);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(id = command.id))]
pub async fn handle(pool: PgPool, command: UpdateProductCommand) -> Result<Product, UpdateProductError> {
    command.validate()?;

    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, sku, name, description, price, active
        FROM products
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(command.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(UpdateProductError::NotFound(command.id))?;

    let updated = command.patch.apply(&current);

    let stored = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = $2, description = $3, price = $4, active = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING id, sku, name, description, price, active
        "#,
    )
    .bind(updated.id)
    .bind(&updated.name)
    .bind(&updated.description)
    .bind(updated.price)
    .bind(updated.active)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_rejected() {
        let cmd: UpdateProductCommand = serde_json::from_str("{}").unwrap();
        assert!(matches!(cmd.validate(), Err(UpdateProductError::NoFieldsToUpdate)));
    }

    #[test]
    fn test_flattened_patch() {
        let cmd: UpdateProductCommand =
            serde_json::from_str(r#"{"name": "New", "price": null}"#).unwrap();
        assert_eq!(cmd.patch.name, Some(Some("New".to_string())));
        assert_eq!(cmd.patch.price, Some(None));
        assert!(cmd.validate().is_ok());
    }
}
