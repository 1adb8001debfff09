use async_trait::async_trait;
use vos_protocol::CommitResponse;
use vos_types::{ObjectStats, StagingLocation, StagingMetadata};

use crate::error::SdkResult;

/// The client side of the staging protocol.
///
/// Implementations must map a stale link to
/// [`SdkError::Conflict`](crate::SdkError::Conflict) carrying the server's
/// retry location.
#[async_trait]
pub trait StagingTransport: Send + Sync {
    async fn allocate(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> SdkResult<StagingLocation>;

    async fn link(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
        metadata: &StagingMetadata,
    ) -> SdkResult<ObjectStats>;

    async fn stat(&self, repository: &str, branch: &str, path: &str) -> SdkResult<ObjectStats>;

    async fn commit(&self, repository: &str, branch: &str) -> SdkResult<CommitResponse>;
}
