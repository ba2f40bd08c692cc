//! Part entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use partview_core::types::{FileId, PartId};

use super::geometry::Vec3;

/// One component of a decomposed file.
///
/// Position and size are stored as six nullable columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PartRecord {
    /// Unique part identifier.
    pub id: PartId,
    /// Owning file.
    pub file_id: FileId,
    /// Label reported by the converter (may be empty).
    pub name: String,
    /// User-supplied override of `name`.
    pub display_name: Option<String>,
    /// Stable key, unique within `file_id`.
    pub part_key: String,
    /// Index of the matching node in the viewer container.
    pub node_index: Option<i32>,
    /// Hierarchy path hint from the converter.
    pub node_path: Option<String>,
    /// Key of the parent part as reported by the converter.
    pub parent_key: Option<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub position_z: Option<f64>,
    pub size_x: Option<f64>,
    pub size_y: Option<f64>,
    pub size_z: Option<f64>,
    /// Reserved for hierarchy linkage; always null.
    pub parent_part_id: Option<PartId>,
    /// Position within the reconciliation batch.
    pub ordinal: i32,
    /// When the part row was written.
    pub created_at: DateTime<Utc>,
}

impl PartRecord {
    /// Build a stored record from a reconciled part.
    pub fn from_new(file_id: FileId, ordinal: i32, part: &NewPart) -> Self {
        Self {
            id: PartId::new(),
            file_id,
            name: part.name.clone(),
            display_name: part.display_name.clone(),
            part_key: part.part_key.clone(),
            node_index: part.node_index,
            node_path: part.node_path.clone(),
            parent_key: part.parent_key.clone(),
            position_x: part.position.map(|v| v.x),
            position_y: part.position.map(|v| v.y),
            position_z: part.position.map(|v| v.z),
            size_x: part.size.map(|v| v.x),
            size_y: part.size.map(|v| v.y),
            size_z: part.size.map(|v| v.z),
            parent_part_id: None,
            ordinal,
            created_at: Utc::now(),
        }
    }

    /// The name to show: the override unless it is null or blank.
    pub fn resolved_display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.name,
        }
    }
}

/// A part produced by reconciliation, not yet stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPart {
    pub name: String,
    pub display_name: Option<String>,
    pub part_key: String,
    pub node_index: Option<i32>,
    pub node_path: Option<String>,
    pub parent_key: Option<String>,
    pub position: Option<Vec3>,
    pub size: Option<Vec3>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_part() -> NewPart {
        NewPart {
            name: "Bolt".to_string(),
            display_name: None,
            part_key: "p1".to_string(),
            node_index: Some(3),
            node_path: Some("Root/Bolt".to_string()),
            parent_key: None,
            position: Some(Vec3::new(1.0, 2.0, 3.0)),
            size: None,
        }
    }

    #[test]
    fn test_from_new_flattens_vectors() {
        let record = PartRecord::from_new(FileId::new(), 0, &new_part());
        assert_eq!(
            (record.position_x, record.position_y, record.position_z),
            (Some(1.0), Some(2.0), Some(3.0))
        );
        assert_eq!(record.size_x, None);
        assert!(record.parent_part_id.is_none());
    }

    #[test]
    fn test_resolved_display_name_falls_back_on_blank() {
        let mut record = PartRecord::from_new(FileId::new(), 0, &new_part());
        assert_eq!(record.resolved_display_name(), "Bolt");
        record.display_name = Some("   ".to_string());
        assert_eq!(record.resolved_display_name(), "Bolt");
        record.display_name = Some("Hex bolt".to_string());
        assert_eq!(record.resolved_display_name(), "Hex bolt");
    }
}
