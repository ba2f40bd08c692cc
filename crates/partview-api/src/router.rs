//! Route definitions for the PartView HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_upload = usize::try_from(state.config.storage.max_upload_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let api_routes = Router::new()
        .merge(cad_routes())
        .merge(part_routes())
        .merge(health_routes());

    let cors = middleware::cors::build_cors_layer(&state.config.server);

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Upload, file records, containers, and rename-by-key
fn cad_routes() -> Router<AppState> {
    Router::new()
        .route("/cad/upload", post(handlers::cad::upload))
        .route("/cad/files", get(handlers::cad::list_files))
        .route("/cad/files/{id}", get(handlers::cad::get_file))
        .route("/cad/files/{id}/parts", get(handlers::cad::list_parts))
        .route("/cad/files/{id}/glb", get(handlers::cad::download_glb))
        .route(
            "/cad/files/{id}/parts/{part_key}/display-name",
            patch(handlers::cad::rename_part_by_key),
        )
}

/// Single-part lookups, renaming, and notes
fn part_routes() -> Router<AppState> {
    Router::new()
        .route("/parts/{id}", get(handlers::part::get_part))
        .route("/parts/{id}/display-name", patch(handlers::part::rename_part))
        .route(
            "/parts/{id}/note",
            post(handlers::part::save_note).delete(handlers::part::delete_note),
        )
}

/// Liveness and conversion metrics
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
