//! Create product command

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::products::types::Product;
use crate::ingest::models::normalize_key;

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductCommand {
    pub sku: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateProductError {
    #[error("SKU is required and cannot be empty")]
    SkuRequired,
    #[error("Price must be a finite number")]
    PriceInvalid,
    #[error("Product with SKU '{0}' already exists")]
    DuplicateSku(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CreateProductCommand {
    pub fn validate(&self) -> Result<(), CreateProductError> {
        if self.sku.trim().is_empty() {
            return Err(CreateProductError::SkuRequired);
        }
        if matches!(self.price, Some(p) if !p.is_finite()) {
            return Err(CreateProductError::PriceInvalid);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(sku = %command.sku))]
pub async fn handle(pool: PgPool, command: CreateProductCommand) -> Result<Product, CreateProductError> {
    command.validate()?;
    let sku = normalize_key(&command.sku);

    sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (sku, name, description, price, active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, sku, name, description, price, active
        "#,
    )
    .bind(&sku)
    .bind(&command.name)
    .bind(&command.description)
    .bind(command.price)
    .bind(command.active)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return CreateProductError::DuplicateSku(sku.clone());
            }
        }
        CreateProductError::Database(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(sku: &str) -> CreateProductCommand {
        serde_json::from_value(serde_json::json!({ "sku": sku })).unwrap()
    }

    #[test]
    fn test_defaults_to_active() {
        let cmd = command("abc");
        assert!(cmd.active);
        assert!(cmd.name.is_none());
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_blank_sku_rejected() {
        assert!(matches!(
            command("   ").validate(),
            Err(CreateProductError::SkuRequired)
        ));
    }

    #[test]
    fn test_non_finite_price_rejected() {
        let mut cmd = command("abc");
        cmd.price = Some(f64::INFINITY);
        assert!(matches!(cmd.validate(), Err(CreateProductError::PriceInvalid)));
    }
}
