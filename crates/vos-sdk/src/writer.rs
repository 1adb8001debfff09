//! Out-of-band object writes.
//!
//! Object bytes never pass through the VOS server. After allocating a
//! staging location the client writes the bytes to its physical address
//! with an [`ObjectWriter`] and only then links the location.

use std::collections::HashMap;
use std::path::{Component, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{SdkError, SdkResult};

/// Writes object bytes to a physical address.
#[async_trait]
pub trait ObjectWriter: Send + Sync {
    async fn write(&self, physical_address: &str, data: Bytes) -> SdkResult<()>;
}

/// Keeps written objects in memory. Accepts any address.
#[derive(Debug, Default)]
pub struct MemoryObjectWriter {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryObjectWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, physical_address: &str) -> SdkResult<Option<Bytes>> {
        let objects = self
            .objects
            .lock()
            .map_err(|e| SdkError::Internal(e.to_string()))?;
        Ok(objects.get(physical_address).cloned())
    }

    pub fn len(&self) -> SdkResult<usize> {
        let objects = self
            .objects
            .lock()
            .map_err(|e| SdkError::Internal(e.to_string()))?;
        Ok(objects.len())
    }

    pub fn is_empty(&self) -> SdkResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl ObjectWriter for MemoryObjectWriter {
    async fn write(&self, physical_address: &str, data: Bytes) -> SdkResult<()> {
        self.objects
            .lock()
            .map_err(|e| SdkError::Internal(e.to_string()))?
            .insert(physical_address.to_string(), data);
        Ok(())
    }
}

/// Writes `local://` addresses to the local filesystem.
///
/// `local:///srv/vos/r1/data/ab/0190...` is written to
/// `/srv/vos/r1/data/ab/0190...`, creating parent directories as needed.
#[derive(Clone, Debug, Default)]
pub struct LocalFsWriter;

pub const LOCAL_SCHEME: &str = "local://";

impl LocalFsWriter {
    pub fn new() -> Self {
        Self
    }

    /// Filesystem path of a `local://` address.
    pub fn resolve(physical_address: &str) -> SdkResult<PathBuf> {
        let rest = physical_address
            .strip_prefix(LOCAL_SCHEME)
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| SdkError::UnsupportedAddress(physical_address.to_string()))?;
        let path = PathBuf::from(rest);
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(SdkError::UnsupportedAddress(format!(
                "{physical_address}: parent directory segments"
            )));
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectWriter for LocalFsWriter {
    async fn write(&self, physical_address: &str, data: Bytes) -> SdkResult<()> {
        let path = Self::resolve(physical_address)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        tracing::debug!(path = %path.display(), size = data.len(), "object written");
        Ok(())
    }
}
