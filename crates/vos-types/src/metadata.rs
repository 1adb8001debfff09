use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::location::StagingLocation;

/// The client's claim about an object it uploaded to a staging location:
/// "I wrote `size_bytes` bytes to `staging.physical_address` and they hash
/// to `checksum`."
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingMetadata {
    /// The location (address and token) the bytes were written to.
    pub staging: StagingLocation,
    /// Content checksum as computed by the client.
    pub checksum: String,
    /// Number of bytes written.
    pub size_bytes: u64,
    /// Optional MIME type of the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Free-form user metadata.
    #[serde(default)]
    pub user_metadata: BTreeMap<String, String>,
}

impl StagingMetadata {
    pub fn new(staging: StagingLocation, checksum: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            staging,
            checksum: checksum.into(),
            size_bytes,
            content_type: None,
            user_metadata: BTreeMap::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_user_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }

    /// Structural checks that do not depend on repository state.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.staging.physical_address.trim().is_empty() {
            return Err(TypeError::InvalidMetadata("missing physical address".into()));
        }
        if self.staging.token.as_str().is_empty() {
            return Err(TypeError::InvalidMetadata("missing staging token".into()));
        }
        if self.checksum.trim().is_empty() {
            return Err(TypeError::InvalidMetadata("missing checksum".into()));
        }
        if let Some(content_type) = &self.content_type {
            if content_type.trim().is_empty() {
                return Err(TypeError::InvalidMetadata("empty content type".into()));
            }
        }
        if self.user_metadata.keys().any(|k| k.is_empty()) {
            return Err(TypeError::InvalidMetadata("empty user metadata key".into()));
        }
        Ok(())
    }
}
