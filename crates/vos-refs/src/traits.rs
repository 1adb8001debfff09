//! The [`BranchCatalog`] trait defining the repository/branch lookup interface.

use std::sync::Arc;

use crate::error::{CatalogError, CatalogResult};
use crate::state::BranchStagingState;
use crate::types::{BranchInfo, RepositoryInfo};

/// Storage backend for repositories and branches.
///
/// Implementations must be thread-safe (`Send + Sync`). Lookups hand out the
/// branch's shared [`BranchStagingState`]; callers hold the `Arc` only for
/// the duration of one request.
pub trait BranchCatalog: Send + Sync {
    /// Create a repository together with its default branch.
    fn create_repository(
        &self,
        name: &str,
        storage_namespace: &str,
        default_branch: &str,
    ) -> CatalogResult<RepositoryInfo>;

    /// Look up a repository. Returns `Ok(None)` if it does not exist.
    fn find_repository(&self, name: &str) -> CatalogResult<Option<RepositoryInfo>>;

    /// List all repositories sorted by name.
    fn list_repositories(&self) -> CatalogResult<Vec<RepositoryInfo>>;

    /// Create a branch at the initial generation.
    fn create_branch(&self, repository: &str, branch: &str) -> CatalogResult<BranchInfo>;

    /// Look up a branch's staging state.
    ///
    /// Returns `Ok(None)` if the repository exists but the branch does not,
    /// and `Err(RepositoryNotFound)` if the repository does not exist.
    fn find_branch_state(
        &self,
        repository: &str,
        branch: &str,
    ) -> CatalogResult<Option<Arc<BranchStagingState>>>;

    /// Delete a branch, marking its staging state deleted.
    ///
    /// Returns the state of the removed incarnation.
    fn delete_branch(&self, repository: &str, branch: &str) -> CatalogResult<Arc<BranchStagingState>>;

    /// List all branches of a repository sorted by name.
    fn list_branches(&self, repository: &str) -> CatalogResult<Vec<BranchInfo>>;

    /// Look up a repository, failing if it does not exist.
    fn repository(&self, name: &str) -> CatalogResult<RepositoryInfo> {
        self.find_repository(name)?
            .ok_or_else(|| CatalogError::RepositoryNotFound {
                name: name.to_string(),
            })
    }

    /// Look up a branch's staging state, failing if it does not exist.
    fn branch_state(&self, repository: &str, branch: &str) -> CatalogResult<Arc<BranchStagingState>> {
        self.find_branch_state(repository, branch)?
            .ok_or_else(|| CatalogError::BranchNotFound {
                repository: repository.to_string(),
                branch: branch.to_string(),
            })
    }
}
