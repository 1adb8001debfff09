use std::sync::Arc;

use async_trait::async_trait;
use vos_protocol::CommitResponse;
use vos_staging::StagingService;
use vos_types::{ObjectStats, StagingLocation, StagingMetadata};

use crate::error::SdkResult;
use crate::transport::StagingTransport;

/// Calls an in-process [`StagingService`] directly.
#[derive(Clone)]
pub struct LocalTransport {
    service: Arc<StagingService>,
}

impl LocalTransport {
    pub fn new(service: Arc<StagingService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<StagingService> {
        &self.service
    }
}

#[async_trait]
impl StagingTransport for LocalTransport {
    async fn allocate(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> SdkResult<StagingLocation> {
        Ok(self
            .service
            .allocate_staging_location(repository, branch, path)?)
    }

    async fn link(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
        metadata: &StagingMetadata,
    ) -> SdkResult<ObjectStats> {
        Ok(self
            .service
            .link_staging_location(repository, branch, path, metadata)?)
    }

    async fn stat(&self, repository: &str, branch: &str, path: &str) -> SdkResult<ObjectStats> {
        Ok(self.service.stat_object(repository, branch, path)?)
    }

    async fn commit(&self, repository: &str, branch: &str) -> SdkResult<CommitResponse> {
        Ok(self.service.commit(repository, branch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;

    fn transport() -> LocalTransport {
        let service = StagingService::in_memory();
        service.create_repository("r1", "mem://r1", "main").unwrap();
        LocalTransport::new(Arc::new(service))
    }

    #[tokio::test]
    async fn stale_link_surfaces_as_conflict() {
        let t = transport();
        let loc = t.allocate("r1", "main", "a").await.unwrap();
        t.commit("r1", "main").await.unwrap();
        let err = t
            .link("r1", "main", "a", &StagingMetadata::new(loc, "abc", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Conflict { .. }));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let t = transport();
        assert!(matches!(
            t.stat("r1", "main", "nope").await,
            Err(SdkError::NotFound(_))
        ));
    }
}
