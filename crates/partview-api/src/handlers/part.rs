//! Single-part handlers: lookup, rename, notes.

use axum::Json;
use axum::extract::{Path, State};

use partview_core::types::PartId;

use crate::dto::request::{NoteRequest, RenamePartRequest, validate_request};
use crate::dto::response::{ApiResponse, MessageResponse, PartResponse};
use crate::error::ApiError;
use crate::extractors::parse_id;
use crate::state::AppState;

/// GET /api/parts/{id}
pub async fn get_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PartResponse>>, ApiError> {
    let id: PartId = parse_id(&id)?;
    let details = state.query_service.get_part(id).await?;
    Ok(Json(ApiResponse::ok(details.into())))
}

/// PATCH /api/parts/{id}/display-name
pub async fn rename_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RenamePartRequest>,
) -> Result<Json<ApiResponse<PartResponse>>, ApiError> {
    let id: PartId = parse_id(&id)?;
    validate_request(&body)?;
    let display_name = body.display_name.unwrap_or_default();

    state.part_service.rename(id, &display_name).await?;
    let details = state.query_service.get_part(id).await?;
    Ok(Json(ApiResponse::ok(details.into())))
}

/// POST /api/parts/{id}/note
pub async fn save_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<NoteRequest>,
) -> Result<Json<ApiResponse<PartResponse>>, ApiError> {
    let id: PartId = parse_id(&id)?;
    validate_request(&body)?;
    let note = body.note.unwrap_or_default();

    state.part_service.save_note(id, &note).await?;
    let details = state.query_service.get_part(id).await?;
    Ok(Json(ApiResponse::ok(details.into())))
}

/// DELETE /api/parts/{id}/note
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id: PartId = parse_id(&id)?;
    state.part_service.delete_note(id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Note deleted".to_string(),
    })))
}
