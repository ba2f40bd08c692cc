//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partview_converter::MetricsSnapshot;
use partview_core::types::{FileId, PartId};
use partview_entity::file::{FileRecord, FileStatus};
use partview_entity::part::PartRecord;
use partview_service::{FileDetails, PartDetails};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// An uploaded file and, on detail requests, its parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CadFileResponse {
    pub id: FileId,
    pub original_filename: String,
    pub file_size: i64,
    pub status: FileStatus,
    /// Server-side container location; set only when completed.
    pub container_path: Option<String>,
    /// Where the viewer fetches the container.
    pub glb_url: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<PartResponse>>,
}

impl CadFileResponse {
    /// Summary without parts.
    pub fn summary(file: FileRecord) -> Self {
        let glb_url = file
            .container_path
            .as_ref()
            .filter(|_| file.status == FileStatus::Completed)
            .map(|_| format!("/api/cad/files/{}/glb", file.id));
        Self {
            id: file.id,
            original_filename: file.original_filename,
            file_size: file.size_bytes,
            status: file.status,
            container_path: file.container_path,
            glb_url,
            uploaded_at: file.uploaded_at,
            parts: None,
        }
    }
}

impl From<FileDetails> for CadFileResponse {
    fn from(details: FileDetails) -> Self {
        let mut response = Self::summary(details.file);
        response.parts = Some(details.parts.into_iter().map(PartResponse::from).collect());
        response
    }
}

/// A part as shown to the viewer. `displayName` is already resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartResponse {
    pub id: PartId,
    pub file_id: FileId,
    pub name: String,
    pub display_name: String,
    pub part_key: String,
    pub node_index: Option<i32>,
    pub node_path: Option<String>,
    pub parent_key: Option<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub position_z: Option<f64>,
    pub size_x: Option<f64>,
    pub size_y: Option<f64>,
    pub size_z: Option<f64>,
    pub note: Option<String>,
}

impl PartResponse {
    /// Build from a part row and optional note text.
    pub fn new(part: PartRecord, note: Option<String>) -> Self {
        Self {
            display_name: part.resolved_display_name().to_string(),
            id: part.id,
            file_id: part.file_id,
            name: part.name,
            part_key: part.part_key,
            node_index: part.node_index,
            node_path: part.node_path,
            parent_key: part.parent_key,
            position_x: part.position_x,
            position_y: part.position_y,
            position_z: part.position_z,
            size_x: part.size_x,
            size_y: part.size_y,
            size_z: part.size_z,
            note,
        }
    }
}

impl From<PartDetails> for PartResponse {
    fn from(details: PartDetails) -> Self {
        Self::new(details.part, details.note.map(|n| n.note))
    }
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_seconds: u64,
    /// Ingestions submitted and not yet finished.
    pub in_flight: usize,
    /// Conversion counters and duration percentiles.
    pub conversions: MetricsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(status: FileStatus, container: Option<&str>) -> FileRecord {
        FileRecord {
            id: FileId::new(),
            original_filename: "valve.step".to_string(),
            stored_path: "/data/uploads/1_valve.step".to_string(),
            size_bytes: 2048,
            container_path: container.map(str::to_string),
            status,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_uses_camel_case_and_glb_url() {
        let record = file(FileStatus::Completed, Some("/data/converted/x/assembly.glb"));
        let id = record.id;
        let json = serde_json::to_value(CadFileResponse::summary(record)).unwrap();
        assert_eq!(json["originalFilename"], "valve.step");
        assert_eq!(json["fileSize"], 2048);
        assert_eq!(json["status"], "completed");
        assert_eq!(json["glbUrl"], format!("/api/cad/files/{id}/glb"));
        assert!(json.get("parts").is_none());
    }

    #[test]
    fn test_no_glb_url_until_completed() {
        let json = serde_json::to_value(CadFileResponse::summary(file(FileStatus::Processing, None)))
            .unwrap();
        assert!(json["glbUrl"].is_null());
    }
}
