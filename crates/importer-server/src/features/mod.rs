//! HTTP feature slices
//!
//! Each feature is a vertical slice with `commands/` (writes), `queries/`
//! (reads) and a `routes.rs` that maps its errors to HTTP responses.
//!
//! - **imports**: CSV upload and progress polling
//! - **products**: catalog CRUD
//! - **webhooks**: subscription CRUD and test delivery

pub mod imports;
pub mod products;
pub mod webhooks;

use axum::Router;
use std::sync::Arc;

use crate::webhooks::WebhookDispatcher;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub db: sqlx::PgPool,
    pub imports: imports::ImportState,
    pub dispatcher: Arc<WebhookDispatcher>,
}

/// Mount every feature under its own prefix
pub fn router(state: FeatureState) -> Router<()> {
    let webhook_state = webhooks::WebhookState {
        db: state.db.clone(),
        dispatcher: state.dispatcher,
    };

    Router::new()
        .nest("/imports", imports::imports_routes().with_state(state.imports))
        .nest("/products", products::products_routes().with_state(state.db))
        .nest("/webhooks", webhooks::webhooks_routes().with_state(webhook_state))
}
