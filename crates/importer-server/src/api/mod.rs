pub mod response;

use crate::config::CorsConfig;
use crate::error::{AppError, AppResult};
use crate::features::{self, FeatureState};
use crate::middleware;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::{json, Value};
use sqlx::PgPool;

/// Build the application router with all routes and middleware
pub fn create_router(state: FeatureState, cors: &CorsConfig) -> Router {
    let db = state.db.clone();
    let api_v1 = features::router(state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(db)
        .nest("/api/v1", api_v1)
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Importer Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health_check(State(db): State<PgPool>) -> AppResult<Json<Value>> {
    if let Err(e) = sqlx::query("SELECT 1").fetch_one(&db).await {
        tracing::error!(error = ?e, "Database health check failed");
        return Err(AppError::Unavailable("database unreachable".to_string()));
    }

    Ok(Json(json!({
        "status": "healthy",
        "database": "connected"
    })))
}
