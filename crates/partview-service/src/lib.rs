//! # partview-service
//!
//! Application services for PartView. The ingestion module owns the
//! conversion state machine; the remaining services are thin use cases
//! over the record store.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod ingest;
pub mod part;
pub mod query;
pub mod upload;

pub use ingest::{IngestionDispatcher, IngestionPipeline, Reconciler};
pub use part::PartService;
pub use query::{FileDetails, FileQueryService, PartDetails};
pub use upload::UploadService;
