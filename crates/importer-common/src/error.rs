//! Error types shared across the importer crates

use thiserror::Error;

/// Result type alias for importer operations
pub type Result<T> = std::result::Result<T, ImporterError>;

/// Errors that are not owned by a single subsystem
#[derive(Error, Debug)]
pub enum ImporterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ImporterError {
    /// Build a configuration error from anything printable
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Returns true when `url` uses a scheme the webhook sender can reach
pub fn is_http_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    (lower.starts_with("http://") && lower.len() > "http://".len())
        || (lower.starts_with("https://") && lower.len() > "https://".len())
}

/// Reject URLs that are not http(s)
pub fn validate_http_url(url: &str) -> Result<()> {
    if is_http_url(url) {
        Ok(())
    } else {
        Err(ImporterError::InvalidUrl(url.to_string()))
    }
}
