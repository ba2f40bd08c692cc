//! Uploaded file records and their ingestion status.

pub mod model;
pub mod status;

pub use model::{CreateFileRecord, FileRecord};
pub use status::{FileState, FileStatus};
