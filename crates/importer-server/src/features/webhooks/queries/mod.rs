pub mod list;

pub use list::ListWebhooksError;
