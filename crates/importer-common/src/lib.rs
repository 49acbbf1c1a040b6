//! Importer Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the importer workspace.
//!
//! - **Error Handling**: [`ImporterError`] and the [`Result`] alias
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`]
//!
//! # Example
//!
//! ```no_run
//! use importer_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("importer started");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{ImporterError, Result};
