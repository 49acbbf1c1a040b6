//! List products query

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::api::response::PageMeta;
use crate::features::products::types::Product;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListProductsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Case-insensitive substring of the SKU
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Case-insensitive substring of the name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListProductsResponse {
    pub items: Vec<Product>,
    pub page: PageMeta,
}

#[derive(Debug, thiserror::Error)]
pub enum ListProductsError {
    #[error("Page must be greater than 0 and keep the offset in range")]
    InvalidPage,
    #[error("Limit must be between 1 and 500")]
    InvalidLimit,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ListProductsQuery {
    pub fn validate(&self) -> Result<(), ListProductsError> {
        if matches!(self.page, Some(page) if page < 1) {
            return Err(ListProductsError::InvalidPage);
        }
        if matches!(self.limit, Some(limit) if !(1..=MAX_LIMIT).contains(&limit)) {
            return Err(ListProductsError::InvalidLimit);
        }
        if (self.page() - 1).checked_mul(self.limit()).is_none() {
            return Err(ListProductsError::InvalidPage);
        }
        Ok(())
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    fn build(&self) -> QueryBuilder<'_, Postgres> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, sku, name, description, price, active FROM products WHERE TRUE",
        );

        if let Some(sku) = self.sku.as_deref().filter(|s| !s.is_empty()) {
            builder
                .push(" AND sku ILIKE ")
                .push_bind(contains_pattern(&sku.to_lowercase()));
        }
        if let Some(name) = self.name.as_deref().filter(|s| !s.is_empty()) {
            builder
                .push(" AND name ILIKE ")
                .push_bind(contains_pattern(name));
        }
        if let Some(active) = self.active {
            builder.push(" AND active = ").push_bind(active);
        }

        builder
            .push(" ORDER BY id LIMIT ")
            .push_bind(self.limit())
            .push(" OFFSET ")
            .push_bind(self.offset());
        builder
    }
}

/// `ILIKE` pattern matching `input` as a literal substring
fn contains_pattern(input: &str) -> String {
    let mut pattern = String::with_capacity(input.len() + 2);
    pattern.push('%');
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListProductsQuery,
) -> Result<ListProductsResponse, ListProductsError> {
    query.validate()?;

    let items = query
        .build()
        .build_query_as::<Product>()
        .fetch_all(&pool)
        .await?;

    let page = PageMeta::new(query.page(), query.limit(), items.len());
    Ok(ListProductsResponse { items, page })
}
