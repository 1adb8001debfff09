//! Physical address allocation.
//!
//! Addresses have the layout
//! `<storage_namespace>/<data_prefix>/<shard>/<uuid-v7>`. The shard is two
//! hex characters of a BLAKE3 hash over the logical location, which spreads
//! objects across storage key prefixes; the UUID v7 makes every address
//! unique, so a retry never lands on an address still referenced by an
//! earlier allocation. The token issued with an address is bound to it.

use std::sync::Arc;

use uuid::Uuid;
use vos_refs::BranchCatalog;
use vos_types::StagingLocation;

use crate::config::StagingConfig;
use crate::error::{StagingError, StagingResult};
use crate::token::StagingTokenIssuer;

/// Reject logical paths that cannot name an object.
pub fn validate_path(path: &str) -> StagingResult<()> {
    if path.is_empty() {
        return Err(StagingError::InvalidPath("empty path".into()));
    }
    if path.contains('\0') {
        return Err(StagingError::InvalidPath(format!("{path:?}: contains NUL")));
    }
    Ok(())
}

/// Produces fresh staging locations. Never touches any staging area.
pub struct PhysicalAddressAllocator {
    catalog: Arc<dyn BranchCatalog>,
    issuer: StagingTokenIssuer,
    data_prefix: String,
}

impl PhysicalAddressAllocator {
    pub fn new(catalog: Arc<dyn BranchCatalog>, config: &StagingConfig) -> Self {
        Self {
            issuer: StagingTokenIssuer::new(Arc::clone(&catalog)),
            catalog,
            data_prefix: config.data_prefix.trim_matches('/').to_string(),
        }
    }

    /// Allocate a new location for `path` on `repository/branch`.
    pub fn allocate(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> StagingResult<StagingLocation> {
        validate_path(path)?;
        let repo = self.catalog.repository(repository)?;
        let physical_address =
            self.physical_address(&repo.storage_namespace, repository, branch, path);
        let token = self.issuer.issue(repository, branch, &physical_address)?;

        tracing::debug!(
            repository,
            branch,
            path,
            physical_address = %physical_address,
            "staging location allocated"
        );
        Ok(StagingLocation::new(physical_address, token))
    }

    /// Returns `true` if `address` lies under this allocator's data prefix in
    /// `storage_namespace`.
    pub fn owns_address(&self, storage_namespace: &str, address: &str) -> bool {
        let prefix = format!("{storage_namespace}/{}/", self.data_prefix);
        address
            .strip_prefix(&prefix)
            .is_some_and(|rest| !rest.is_empty() && !rest.split('/').any(|seg| seg == ".."))
    }

    fn physical_address(
        &self,
        storage_namespace: &str,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(repository.as_bytes());
        hasher.update(b"\0");
        hasher.update(branch.as_bytes());
        hasher.update(b"\0");
        hasher.update(path.as_bytes());
        let shard = hex::encode(&hasher.finalize().as_bytes()[..1]);
        format!(
            "{storage_namespace}/{}/{shard}/{}",
            self.data_prefix,
            Uuid::now_v7().simple()
        )
    }
}
