//! Retry advice for links that lost the race against a commit.

use std::sync::Arc;

use vos_types::StagingLocation;

use crate::allocator::PhysicalAddressAllocator;
use crate::error::StagingResult;

/// Produces the location a client should retry at after a stale link.
///
/// The client lost a race against a concurrent commit, not a transient
/// fault, so no backoff is suggested: retrying immediately is correct.
pub struct ConflictAdvisor {
    allocator: Arc<PhysicalAddressAllocator>,
}

impl ConflictAdvisor {
    pub fn new(allocator: Arc<PhysicalAddressAllocator>) -> Self {
        Self { allocator }
    }

    /// A fresh location, exactly as allocation would produce it.
    pub fn advise_on_conflict(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> StagingResult<StagingLocation> {
        let hint = self.allocator.allocate(repository, branch, path)?;
        tracing::warn!(
            repository,
            branch,
            path,
            retry_address = %hint.physical_address,
            "stale staging token; advising retry"
        );
        Ok(hint)
    }
}
