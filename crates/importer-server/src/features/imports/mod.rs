pub mod commands;
pub mod queries;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use crate::ingest::{JobQueue, ProgressStore};

pub use commands::{SubmitImportCommand, SubmitImportError, SubmitImportResponse};
pub use queries::{ImportProgressError, ImportProgressQuery, ImportProgressView};
pub use routes::imports_routes;

/// Shared handles for the import endpoints
#[derive(Clone)]
pub struct ImportState {
    pub progress: Arc<dyn ProgressStore>,
    pub queue: Arc<dyn JobQueue>,
    pub upload_dir: PathBuf,
}
