pub mod progress;

pub use progress::{ImportProgressError, ImportProgressQuery, ImportProgressView};
