pub mod create;
pub mod delete;
pub mod send_test;
pub mod update;

pub use create::{CreateWebhookCommand, CreateWebhookError};
pub use delete::{DeleteWebhookCommand, DeleteWebhookError, DeleteWebhookResponse};
pub use send_test::{TestWebhookCommand, TestWebhookError, TestWebhookResponse};
pub use update::{UpdateWebhookCommand, UpdateWebhookError};
