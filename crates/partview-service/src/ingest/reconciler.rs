//! Normalizes converter output into stored parts.
//!
//! Each pass replaces every part of the file. Payload problems yield zero
//! parts and are recorded in the report; node-map problems are reported as
//! a [`NodeMapOutcome`]. Only store failures while writing parts are
//! errors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use partview_converter::metadata::{
    PartDescriptor, PartKeyAllocator, parse_node_map, parse_parts_payload,
};
use partview_core::result::AppResult;
use partview_core::types::FileId;
use partview_database::RecordStore;
use partview_entity::part::{NewPart, Vec3};

/// Why node indices were not patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeMapSkip {
    /// The strategy produced no node map.
    NotProduced,
    /// A node map path was given but nothing exists there.
    FileMissing(PathBuf),
    /// The file exists but could not be read.
    Unreadable(String),
    /// The file is not a JSON list of node entries.
    Malformed(String),
    /// The list is empty.
    Empty,
    /// The store rejected a patch.
    PatchFailed(String),
}

impl fmt::Display for NodeMapSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotProduced => write!(f, "no node map produced"),
            Self::FileMissing(path) => write!(f, "node map missing at {}", path.display()),
            Self::Unreadable(msg) => write!(f, "node map unreadable: {msg}"),
            Self::Malformed(msg) => write!(f, "node map malformed: {msg}"),
            Self::Empty => write!(f, "node map is empty"),
            Self::PatchFailed(msg) => write!(f, "node index patch failed: {msg}"),
        }
    }
}

/// Result of the node-map enrichment step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeMapOutcome {
    /// The map was read; `updated_rows` parts matched by key.
    Applied {
        /// Entries with both a key and an index.
        entries: usize,
        /// Part rows whose node index changed.
        updated_rows: u64,
    },
    /// Nothing was patched.
    Skipped(NodeMapSkip),
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Parts written for the file.
    pub parts_written: usize,
    /// Why the payload produced no parts, if it was unusable.
    pub payload_error: Option<String>,
    /// Outcome of node-map enrichment.
    pub node_map: NodeMapOutcome,
}

impl ReconcileReport {
    /// Node indices patched by this pass.
    pub fn patched_rows(&self) -> u64 {
        match self.node_map {
            NodeMapOutcome::Applied { updated_rows, .. } => updated_rows,
            NodeMapOutcome::Skipped(_) => 0,
        }
    }
}

/// Writes reconciled parts through the record store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    records: Arc<dyn RecordStore>,
}

impl Reconciler {
    /// Create a reconciler over a record store.
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Replace the parts of `file_id` with the contents of `payload`, then
    /// patch node indices from `node_map` if one was produced.
    pub async fn reconcile(
        &self,
        file_id: FileId,
        payload: &str,
        node_map: Option<&Path>,
    ) -> AppResult<ReconcileReport> {
        let parsed = parse_parts_payload(payload);
        if let Some(error) = &parsed.error {
            warn!(file_id = %file_id, error = %error, "Part payload unusable; storing no parts");
        }

        let parts = build_parts(&parsed.descriptors);
        let written = self.records.replace_parts(file_id, &parts).await?;
        info!(file_id = %file_id, parts = written.len(), "Parts replaced");

        let node_map = match node_map {
            Some(path) => self.apply_node_map(file_id, path).await,
            None => NodeMapOutcome::Skipped(NodeMapSkip::NotProduced),
        };
        if let NodeMapOutcome::Skipped(reason) = &node_map {
            debug!(file_id = %file_id, reason = %reason, "Node indices not patched");
        }

        Ok(ReconcileReport {
            parts_written: written.len(),
            payload_error: parsed.error,
            node_map,
        })
    }

    /// Remove every part of `file_id`, as a pass over an empty payload would.
    pub async fn clear(&self, file_id: FileId) -> AppResult<()> {
        self.records.replace_parts(file_id, &[]).await?;
        Ok(())
    }

    /// Patch node indices by part key. Never fails.
    pub async fn apply_node_map(&self, file_id: FileId, path: &Path) -> NodeMapOutcome {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return NodeMapOutcome::Skipped(NodeMapSkip::FileMissing(path.to_path_buf()));
            }
            Err(e) => return NodeMapOutcome::Skipped(NodeMapSkip::Unreadable(e.to_string())),
        };

        let entries = match parse_node_map(&text) {
            Ok(entries) => entries,
            Err(e) => return NodeMapOutcome::Skipped(NodeMapSkip::Malformed(e.to_string())),
        };
        if entries.is_empty() {
            return NodeMapOutcome::Skipped(NodeMapSkip::Empty);
        }

        let mut applicable = 0;
        let mut updated_rows = 0;
        for (part_key, node_index) in entries.iter().filter_map(|e| e.patch_target()) {
            applicable += 1;
            match self
                .records
                .update_node_index(file_id, part_key, node_index)
                .await
            {
                Ok(rows) => updated_rows += rows,
                Err(e) => {
                    warn!(file_id = %file_id, part_key, error = %e, "Node index patch failed");
                    return NodeMapOutcome::Skipped(NodeMapSkip::PatchFailed(e.to_string()));
                }
            }
        }

        info!(
            file_id = %file_id,
            entries = applicable,
            updated_rows,
            "Node map applied"
        );
        NodeMapOutcome::Applied {
            entries: applicable,
            updated_rows,
        }
    }
}

/// Turn descriptors into parts, synthesizing missing keys.
pub fn build_parts(descriptors: &[PartDescriptor]) -> Vec<NewPart> {
    let mut keys = PartKeyAllocator::new();
    descriptors
        .iter()
        .map(|d| NewPart {
            name: d.name.clone().unwrap_or_default(),
            display_name: None,
            part_key: keys.resolve(d.part_key.as_deref(), d.name.as_deref()),
            node_index: d.node_index,
            node_path: d.node_path.clone(),
            parent_key: d.parent_key.clone(),
            position: d.position.as_deref().and_then(Vec3::from_slice),
            size: d.size.as_deref().and_then(Vec3::from_slice),
        })
        .collect()
}
