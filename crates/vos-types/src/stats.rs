use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metadata::StagingMetadata;

/// Kind of entry a path resolves to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    #[default]
    Object,
}

/// A logical object entry on a branch, produced by a successful link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStats {
    /// Logical path relative to the branch.
    pub path: String,
    #[serde(default)]
    pub path_type: PathType,
    /// Where the bytes live in underlying storage.
    pub physical_address: String,
    pub checksum: String,
    pub size_bytes: u64,
    /// Link time, seconds since UNIX epoch.
    pub mtime: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ObjectStats {
    /// Build the entry a link of `metadata` at `path` produces.
    pub fn from_metadata(path: impl Into<String>, metadata: &StagingMetadata, mtime: i64) -> Self {
        Self {
            path: path.into(),
            path_type: PathType::Object,
            physical_address: metadata.staging.physical_address.clone(),
            checksum: metadata.checksum.clone(),
            size_bytes: metadata.size_bytes,
            mtime,
            content_type: metadata.content_type.clone(),
            metadata: metadata.user_metadata.clone(),
        }
    }

    /// Returns `true` if this entry records exactly what `metadata` claims,
    /// ignoring the link time.
    pub fn describes(&self, metadata: &StagingMetadata) -> bool {
        self.physical_address == metadata.staging.physical_address
            && self.checksum == metadata.checksum
            && self.size_bytes == metadata.size_bytes
            && self.content_type == metadata.content_type
            && self.metadata == metadata.user_metadata
    }
}
