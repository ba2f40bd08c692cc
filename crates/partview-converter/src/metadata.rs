//! Part metadata documents produced by the converters.
//!
//! The mesh converter prints a [`PartsDocument`] on stdout, the solid
//! decomposition writes one to `parts.json`, and the assembler writes a
//! list of [`NodeMapEntry`] values to `node_map.json`. Unknown fields are
//! ignored everywhere; converters add fields freely.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Top-level shape of a part list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartsDocument {
    /// The parts, absent when the converter found none.
    #[serde(default)]
    pub parts: Option<Vec<PartDescriptor>>,
}

/// One part as reported by a converter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartDescriptor {
    #[serde(default)]
    pub part_key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub node_index: Option<i32>,
    #[serde(default)]
    pub node_path: Option<String>,
    #[serde(default)]
    pub parent_key: Option<String>,
    #[serde(default)]
    pub position: Option<Vec<f64>>,
    #[serde(default)]
    pub size: Option<Vec<f64>>,
    #[serde(default)]
    pub mesh_path: Option<String>,
}

/// One node of the assembled container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMapEntry {
    #[serde(default)]
    pub part_key: Option<String>,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub node_path: Option<String>,
    #[serde(default)]
    pub parent_key: Option<String>,
    #[serde(default)]
    pub node_index: Option<i32>,
    #[serde(default)]
    pub mesh_path: Option<String>,
    #[serde(default)]
    pub position: Option<Vec<f64>>,
    #[serde(default)]
    pub size: Option<Vec<f64>>,
}

impl NodeMapEntry {
    /// The key and index when both are usable for patching.
    pub fn patch_target(&self) -> Option<(&str, i32)> {
        let key = self.part_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some((key, self.node_index?))
    }
}

/// Result of parsing a part payload. Parsing never fails outright.
#[derive(Debug, Clone, Default)]
pub struct ParsedParts {
    /// Descriptors in document order.
    pub descriptors: Vec<PartDescriptor>,
    /// Why the payload yielded no descriptors, if it was unusable.
    pub error: Option<String>,
}

/// Parse a part payload, recording rather than returning failures.
///
/// Blank text, malformed JSON, and a document without a `parts` list all
/// yield zero descriptors with `error` set.
pub fn parse_parts_payload(text: &str) -> ParsedParts {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedParts {
            descriptors: Vec::new(),
            error: Some("payload is empty".to_string()),
        };
    }

    match serde_json::from_str::<PartsDocument>(trimmed) {
        Ok(PartsDocument { parts: Some(parts) }) => ParsedParts {
            descriptors: parts,
            error: None,
        },
        Ok(PartsDocument { parts: None }) => ParsedParts {
            descriptors: Vec::new(),
            error: Some("payload has no 'parts' list".to_string()),
        },
        Err(e) => ParsedParts {
            descriptors: Vec::new(),
            error: Some(format!("payload is not valid JSON: {e}")),
        },
    }
}

/// Parse the assembler's node map.
pub fn parse_node_map(text: &str) -> Result<Vec<NodeMapEntry>, serde_json::Error> {
    serde_json::from_str(text)
}

/// Hands out part keys for one reconciliation batch.
///
/// Converter-supplied keys pass through untouched. Parts without one get
/// `fallback:<name or "Part">:<n>`, where `n` counts synthesized keys only.
/// A key already handed out in this batch is treated as missing, so every
/// key the allocator returns is unique within the batch.
#[derive(Debug, Default)]
pub struct PartKeyAllocator {
    synthesized: u32,
    issued: HashSet<String>,
}

impl PartKeyAllocator {
    /// Start a new batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the key of one descriptor.
    pub fn resolve(&mut self, part_key: Option<&str>, name: Option<&str>) -> String {
        if let Some(key) = part_key.filter(|k| !k.trim().is_empty()) {
            if self.issued.insert(key.to_string()) {
                return key.to_string();
            }
            warn!(part_key = key, "Duplicate part key in batch; synthesizing a fallback");
        }
        let base = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("Part");
        loop {
            self.synthesized += 1;
            let key = format!("fallback:{base}:{}", self.synthesized);
            if self.issued.insert(key.clone()) {
                return key;
            }
        }
    }
}
