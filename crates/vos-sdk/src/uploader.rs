//! Allocate, write, link: the full staged upload.
//!
//! [`StagedUploader`] needs no locking or back-off. A conflict on link means
//! a commit landed between allocation and link; the conflict carries a fresh
//! location, so the uploader rewrites the bytes there and links again right
//! away. Only the number of rounds is bounded.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use vos_types::{ObjectStats, StagingMetadata};

use crate::error::{SdkError, SdkResult};
use crate::transport::StagingTransport;
use crate::writer::ObjectWriter;

/// Optional object attributes recorded on link.
#[derive(Clone, Debug, Default)]
pub struct UploadOptions {
    pub content_type: Option<String>,
    pub user_metadata: BTreeMap<String, String>,
}

impl UploadOptions {
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_user_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }
}

/// Result of a successful upload.
#[derive(Clone, Debug)]
pub struct UploadOutcome {
    pub stats: ObjectStats,
    /// Write/link rounds it took; more than one means a commit intervened.
    pub attempts: u32,
}

/// Uploads objects through a [`StagingTransport`] and an [`ObjectWriter`].
pub struct StagedUploader {
    transport: Arc<dyn StagingTransport>,
    writer: Arc<dyn ObjectWriter>,
    max_attempts: u32,
}

/// Hex BLAKE3 digest recorded as the object checksum.
pub fn checksum(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

impl StagedUploader {
    pub fn new(
        transport: Arc<dyn StagingTransport>,
        writer: Arc<dyn ObjectWriter>,
        max_attempts: u32,
    ) -> Self {
        Self {
            transport,
            writer,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn upload(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
        data: Bytes,
    ) -> SdkResult<UploadOutcome> {
        self.upload_with(repository, branch, path, data, &UploadOptions::default())
            .await
    }

    pub async fn upload_with(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> SdkResult<UploadOutcome> {
        let checksum = checksum(&data);
        let size_bytes = data.len() as u64;
        let mut location = self.transport.allocate(repository, branch, path).await?;

        for attempt in 1..=self.max_attempts {
            self.writer
                .write(&location.physical_address, data.clone())
                .await?;

            let mut metadata = StagingMetadata::new(location, checksum.clone(), size_bytes);
            metadata.content_type = options.content_type.clone();
            metadata.user_metadata = options.user_metadata.clone();

            match self.transport.link(repository, branch, path, &metadata).await {
                Ok(stats) => {
                    tracing::debug!(repository, branch, path, attempt, "upload linked");
                    return Ok(UploadOutcome {
                        stats,
                        attempts: attempt,
                    });
                }
                Err(SdkError::Conflict { hint }) => {
                    tracing::warn!(
                        repository,
                        branch,
                        path,
                        attempt,
                        retry_address = %hint.physical_address,
                        "branch committed during upload, rewriting at hinted location"
                    );
                    location = hint;
                }
                Err(err) => return Err(err),
            }
        }

        Err(SdkError::RetriesExhausted {
            attempts: self.max_attempts,
        })
    }
}
