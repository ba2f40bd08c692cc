//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use partview_core::error::AppError;

/// Body of the display-name endpoints.
///
/// `displayName` must be present; an empty string resets the override.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenamePartRequest {
    /// New display name.
    #[validate(required(message = "displayName is required"))]
    pub display_name: Option<String>,
}

/// Body of the note endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NoteRequest {
    /// Note text.
    #[validate(required(message = "note is required"))]
    pub note: Option<String>,
}

/// Run `validator` checks and flatten failures into one validation error.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), AppError> {
    request.validate().map_err(|errors| {
        let messages: Vec<String> = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        AppError::validation(messages.join("; "))
    })
}
