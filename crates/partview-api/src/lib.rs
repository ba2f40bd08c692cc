//! # partview-api
//!
//! HTTP API layer for PartView built on Axum.
//!
//! Provides the upload, query, rename, note, and health endpoints, the
//! CORS and request-logging middleware, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
