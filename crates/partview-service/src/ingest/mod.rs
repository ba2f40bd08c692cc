//! Asynchronous conversion of uploaded files.
//!
//! [`IngestionDispatcher`] accepts jobs and runs each in its own task,
//! [`IngestionPipeline`] drives one file through `processing` to a
//! terminal status, and [`Reconciler`] turns converter output into stored
//! parts.

pub mod dispatcher;
pub mod pipeline;
pub mod reconciler;

pub use dispatcher::IngestionDispatcher;
pub use pipeline::IngestionPipeline;
pub use reconciler::{NodeMapOutcome, NodeMapSkip, ReconcileReport, Reconciler};
