//! Webhook subscription API routes
//!
//! - `GET /api/v1/webhooks` - List subscriptions
//! - `POST /api/v1/webhooks` - Register a subscription
//! - `PUT /api/v1/webhooks/:id` - Replace a subscription
//! - `DELETE /api/v1/webhooks/:id` - Remove a subscription
//! - `POST /api/v1/webhooks/:id/test` - Send a test event in the background

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::webhooks::WebhookDispatcher;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::{
    commands::{
        CreateWebhookCommand, CreateWebhookError, DeleteWebhookCommand, DeleteWebhookError,
        TestWebhookCommand, TestWebhookError, UpdateWebhookCommand, UpdateWebhookError,
    },
    queries::ListWebhooksError,
};

#[derive(Clone)]
pub struct WebhookState {
    pub db: PgPool,
    pub dispatcher: Arc<WebhookDispatcher>,
}

pub fn webhooks_routes() -> Router<WebhookState> {
    Router::new()
        .route("/", get(list_webhooks).post(create_webhook))
        .route("/:id", put(update_webhook).delete(delete_webhook))
        .route("/:id/test", post(test_webhook))
}

#[tracing::instrument(skip(state, command))]
async fn create_webhook(
    State(state): State<WebhookState>,
    Json(command): Json<CreateWebhookCommand>,
) -> Result<Response, WebhookApiError> {
    let subscription = super::commands::create::handle(state.db, command).await?;

    tracing::info!(
        id = subscription.id,
        event_type = %subscription.event_type,
        "Webhook registered via API"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(subscription))).into_response())
}

#[tracing::instrument(skip(state))]
async fn list_webhooks(State(state): State<WebhookState>) -> Result<Response, WebhookApiError> {
    let subscriptions = super::queries::list::handle(state.db).await?;
    Ok(ApiResponse::success(subscriptions).into_response())
}

#[tracing::instrument(skip(state, command))]
async fn update_webhook(
    State(state): State<WebhookState>,
    Path(id): Path<i64>,
    Json(mut command): Json<UpdateWebhookCommand>,
) -> Result<Response, WebhookApiError> {
    command.id = id;
    let subscription = super::commands::update::handle(state.db, command).await?;
    Ok(ApiResponse::success(subscription).into_response())
}

#[tracing::instrument(skip(state))]
async fn delete_webhook(
    State(state): State<WebhookState>,
    Path(id): Path<i64>,
) -> Result<Response, WebhookApiError> {
    let response = super::commands::delete::handle(state.db, DeleteWebhookCommand { id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn test_webhook(
    State(state): State<WebhookState>,
    Path(id): Path<i64>,
) -> Result<Response, WebhookApiError> {
    let response =
        super::commands::send_test::handle(state.db, state.dispatcher, TestWebhookCommand { id })
            .await?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
enum WebhookApiError {
    #[error(transparent)]
    Create(#[from] CreateWebhookError),
    #[error(transparent)]
    Update(#[from] UpdateWebhookError),
    #[error(transparent)]
    Delete(#[from] DeleteWebhookError),
    #[error(transparent)]
    Test(#[from] TestWebhookError),
    #[error(transparent)]
    List(#[from] ListWebhooksError),
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            WebhookApiError::Create(CreateWebhookError::UrlInvalid(_))
            | WebhookApiError::Create(CreateWebhookError::EventTypeRequired)
            | WebhookApiError::Update(UpdateWebhookError::UrlInvalid(_))
            | WebhookApiError::Update(UpdateWebhookError::EventTypeRequired) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            },
            WebhookApiError::Update(UpdateWebhookError::NotFound(_))
            | WebhookApiError::Delete(DeleteWebhookError::NotFound(_))
            | WebhookApiError::Test(TestWebhookError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            },
            WebhookApiError::Create(CreateWebhookError::Database(_))
            | WebhookApiError::Update(UpdateWebhookError::Database(_))
            | WebhookApiError::Delete(DeleteWebhookError::Database(_))
            | WebhookApiError::Test(TestWebhookError::Database(_))
            | WebhookApiError::List(ListWebhooksError::Database(_)) => {
                tracing::error!(error = %self, "Database error in webhook API");
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                return error.into_response_with(StatusCode::INTERNAL_SERVER_ERROR);
            },
        };

        ErrorResponse::new(code, self.to_string()).into_response_with(status)
    }
}
