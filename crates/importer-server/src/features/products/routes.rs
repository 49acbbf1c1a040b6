//! Product API routes
//!
//! - `GET /api/v1/products` - List products with paging and filters
//! - `POST /api/v1/products` - Create a product
//! - `PUT /api/v1/products/:id` - Partially update a product
//! - `DELETE /api/v1/products/:id` - Delete a product
//! - `DELETE /api/v1/products` - Delete every product

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;

use super::{
    commands::{
        CreateProductCommand, CreateProductError, DeleteAllProductsCommand, DeleteProductCommand,
        DeleteProductError, UpdateProductCommand, UpdateProductError,
    },
    queries::{ListProductsError, ListProductsQuery},
};

pub fn products_routes() -> Router<PgPool> {
    Router::new()
        .route(
            "/",
            get(list_products)
                .post(create_product)
                .delete(delete_all_products),
        )
        .route("/:id", put(update_product).delete(delete_product))
}

#[tracing::instrument(skip(pool, command), fields(sku = %command.sku))]
async fn create_product(
    State(pool): State<PgPool>,
    Json(command): Json<CreateProductCommand>,
) -> Result<Response, ProductApiError> {
    let product = super::commands::create::handle(pool, command).await?;

    tracing::info!(id = product.id, sku = %product.sku, "Product created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))).into_response())
}

#[tracing::instrument(skip(pool, command))]
async fn update_product(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(mut command): Json<UpdateProductCommand>,
) -> Result<Response, ProductApiError> {
    command.id = id;

    let product = super::commands::update::handle(pool, command).await?;

    Ok(ApiResponse::success(product).into_response())
}

#[tracing::instrument(skip(pool))]
async fn delete_product(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Response, ProductApiError> {
    let response = super::commands::delete::handle(pool, DeleteProductCommand { id }).await?;

    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(pool))]
async fn delete_all_products(State(pool): State<PgPool>) -> Result<Response, ProductApiError> {
    let response = super::commands::delete::handle_all(pool, DeleteAllProductsCommand).await?;

    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(pool, query), fields(page = ?query.page, limit = ?query.limit))]
async fn list_products(
    State(pool): State<PgPool>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Response, ProductApiError> {
    let response = super::queries::list::handle(pool, query).await?;

    tracing::debug!(count = response.items.len(), "Products listed via API");

    let meta = json!({ "page": response.page });
    Ok(ApiResponse::success_with_meta(response.items, meta).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
enum ProductApiError {
    #[error(transparent)]
    Create(#[from] CreateProductError),
    #[error(transparent)]
    Update(#[from] UpdateProductError),
    #[error(transparent)]
    Delete(#[from] DeleteProductError),
    #[error(transparent)]
    List(#[from] ListProductsError),
}

impl IntoResponse for ProductApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ProductApiError::Create(CreateProductError::SkuRequired)
            | ProductApiError::Create(CreateProductError::PriceInvalid)
            | ProductApiError::Update(UpdateProductError::NoFieldsToUpdate)
            | ProductApiError::Update(UpdateProductError::PriceInvalid)
            | ProductApiError::List(ListProductsError::InvalidPage)
            | ProductApiError::List(ListProductsError::InvalidLimit) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            },
            ProductApiError::Create(CreateProductError::DuplicateSku(_)) => {
                (StatusCode::CONFLICT, "CONFLICT")
            },
            ProductApiError::Update(UpdateProductError::NotFound(_))
            | ProductApiError::Delete(DeleteProductError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            },
            ProductApiError::Create(CreateProductError::Database(_))
            | ProductApiError::Update(UpdateProductError::Database(_))
            | ProductApiError::Delete(DeleteProductError::Database(_))
            | ProductApiError::List(ListProductsError::Database(_)) => {
                tracing::error!(error = %self, "Database error in product API");
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                return error.into_response_with(StatusCode::INTERNAL_SERVER_ERROR);
            },
        };

        ErrorResponse::new(code, self.to_string()).into_response_with(status)
    }
}
