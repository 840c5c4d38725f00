//! Provenance and schema descriptors attached to serialized summaries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic version describing the schema of serialized payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
    /// Patch version incremented for bug fixes and documentation updates.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Provenance information recorded for every analysed chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChainProvenance {
    /// SHA-256 digest over the names and contents of the sample files.
    pub input_hash: String,
    /// Sampler format the chain was read as.
    pub sampler: String,
    /// Metadata files the parameter catalog was built from.
    pub metadata_files: Vec<String>,
    /// RFC 3339 timestamp recording when the summary was generated.
    pub created_at: String,
    /// Version map for all tools involved in the analysis.
    pub tool_versions: BTreeMap<String, String>,
}
