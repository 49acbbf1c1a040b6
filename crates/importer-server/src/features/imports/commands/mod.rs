pub mod submit;

pub use submit::{SubmitImportCommand, SubmitImportError, SubmitImportResponse};
