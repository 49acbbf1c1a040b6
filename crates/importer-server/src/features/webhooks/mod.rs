pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    CreateWebhookCommand, CreateWebhookError, DeleteWebhookCommand, DeleteWebhookError,
    TestWebhookCommand, TestWebhookError, UpdateWebhookCommand, UpdateWebhookError,
};
pub use queries::ListWebhooksError;
pub use routes::{webhooks_routes, WebhookState};
