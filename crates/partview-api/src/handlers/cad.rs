//! Upload, file record, and container handlers.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use partview_core::error::{AppError, ErrorKind};
use partview_core::types::FileId;

use crate::dto::request::{RenamePartRequest, validate_request};
use crate::dto::response::{ApiResponse, CadFileResponse, PartResponse};
use crate::error::ApiError;
use crate::extractors::parse_id;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

/// POST /api/cad/upload
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<CadFileResponse>>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;

        let record = state.upload_service.upload(&filename, data).await?;
        return Ok(Json(ApiResponse::ok(CadFileResponse::summary(record))));
    }

    Err(AppError::validation(format!("Multipart field '{UPLOAD_FIELD}' is required")).into())
}

/// GET /api/cad/files
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CadFileResponse>>>, ApiError> {
    let files = state.query_service.list_files().await?;
    Ok(Json(ApiResponse::ok(
        files.into_iter().map(CadFileResponse::summary).collect(),
    )))
}

/// GET /api/cad/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CadFileResponse>>, ApiError> {
    let id: FileId = parse_id(&id)?;
    let details = state.query_service.get_file(id).await?;
    Ok(Json(ApiResponse::ok(details.into())))
}

/// GET /api/cad/files/{id}/parts
pub async fn list_parts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PartResponse>>>, ApiError> {
    let id: FileId = parse_id(&id)?;
    let parts = state.query_service.list_parts(id).await?;
    Ok(Json(ApiResponse::ok(
        parts.into_iter().map(PartResponse::from).collect(),
    )))
}

/// GET /api/cad/files/{id}/glb
pub async fn download_glb(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: FileId = parse_id(&id)?;
    let path = state.query_service.container_file(id).await?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to open container {}", path.display()),
            e,
        )
    })?;
    let length = file.metadata().await.map(|m| m.len()).ok();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "model/gltf-binary")
        .header(header::CACHE_CONTROL, "no-cache");
    if let Some(length) = length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    let response = builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;
    Ok(response)
}

/// PATCH /api/cad/files/{id}/parts/{part_key}/display-name
pub async fn rename_part_by_key(
    State(state): State<AppState>,
    Path((id, part_key)): Path<(String, String)>,
    Json(body): Json<RenamePartRequest>,
) -> Result<Json<ApiResponse<PartResponse>>, ApiError> {
    let id: FileId = parse_id(&id)?;
    validate_request(&body)?;
    let display_name = body.display_name.unwrap_or_default();

    let part = state
        .part_service
        .rename_by_key(id, &part_key, &display_name)
        .await?;
    let details = state.query_service.get_part(part.id).await?;
    Ok(Json(ApiResponse::ok(details.into())))
}
