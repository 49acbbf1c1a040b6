//! Ingestion error taxonomy
//!
//! Every variant ends a job. The worker turns them into the `ERROR:<message>`
//! progress shape, so `Display` output is what pollers see.

use thiserror::Error;

pub type IngestResult<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    /// A numeric column held text that does not parse as a number
    #[error("could not convert value in column '{column}' to a number: '{value}'")]
    InvalidNumber { column: String, value: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Record sink rejected a batch for a reason other than the database driver
    #[error("Record sink error: {0}")]
    Sink(String),

    #[error("Progress store error: {0}")]
    Progress(String),

    #[error("Job queue error: {0}")]
    Queue(String),

    #[error("Invalid progress value: '{0}'")]
    InvalidProgress(String),

    #[error("Invalid job state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Import worker panicked")]
    Panicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_number_message_names_value() {
        let err = IngestError::InvalidNumber {
            column: "price".to_string(),
            value: "not-a-number".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("not-a-number"));
        assert!(message.contains("price"));
    }
}
