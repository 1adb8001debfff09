//! In-memory branch catalog for tests and single-node servers.
//!
//! [`InMemoryBranchCatalog`] stores all repositories in a `HashMap` protected
//! by a `RwLock`. The lock guards only the catalog structure; branch
//! generations live in each branch's [`BranchStagingState`] and are read
//! without touching it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::names::{validate_branch_name, validate_repository_name, validate_storage_namespace};
use crate::state::{BranchStagingState, INITIAL_GENERATION};
use crate::traits::BranchCatalog;
use crate::types::{BranchInfo, RepositoryInfo};

#[derive(Debug)]
struct RepositoryEntry {
    info: RepositoryInfo,
    branches: HashMap<String, BranchEntry>,
}

#[derive(Debug)]
struct BranchEntry {
    state: Arc<BranchStagingState>,
    creation_date: DateTime<Utc>,
}

impl BranchEntry {
    fn new(repository: &str, branch: &str) -> Self {
        Self {
            state: Arc::new(BranchStagingState::new(
                repository,
                branch,
                Uuid::now_v7(),
                INITIAL_GENERATION,
            )),
            creation_date: Utc::now(),
        }
    }

    fn info(&self) -> BranchInfo {
        BranchInfo {
            repository: self.state.repository().to_string(),
            name: self.state.branch().to_string(),
            generation: self.state.current_generation(),
            incarnation: self.state.incarnation(),
            creation_date: self.creation_date,
        }
    }
}

/// An in-memory implementation of [`BranchCatalog`].
///
/// Data is lost when the catalog is dropped.
#[derive(Debug, Default)]
pub struct InMemoryBranchCatalog {
    repositories: RwLock<HashMap<String, RepositoryEntry>>,
}

impl InMemoryBranchCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CatalogResult<RwLockReadGuard<'_, HashMap<String, RepositoryEntry>>> {
        self.repositories
            .read()
            .map_err(|e| CatalogError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> CatalogResult<RwLockWriteGuard<'_, HashMap<String, RepositoryEntry>>> {
        self.repositories
            .write()
            .map_err(|e| CatalogError::LockPoisoned(e.to_string()))
    }
}

fn repository_not_found(name: &str) -> CatalogError {
    CatalogError::RepositoryNotFound {
        name: name.to_string(),
    }
}

impl BranchCatalog for InMemoryBranchCatalog {
    fn create_repository(
        &self,
        name: &str,
        storage_namespace: &str,
        default_branch: &str,
    ) -> CatalogResult<RepositoryInfo> {
        validate_repository_name(name)?;
        validate_storage_namespace(storage_namespace)?;
        validate_branch_name(default_branch)?;

        let mut repos = self.write()?;
        if repos.contains_key(name) {
            return Err(CatalogError::RepositoryExists {
                name: name.to_string(),
            });
        }

        let info = RepositoryInfo {
            name: name.to_string(),
            storage_namespace: storage_namespace.trim_end_matches('/').to_string(),
            default_branch: default_branch.to_string(),
            creation_date: Utc::now(),
        };
        let mut branches = HashMap::new();
        branches.insert(default_branch.to_string(), BranchEntry::new(name, default_branch));
        repos.insert(
            name.to_string(),
            RepositoryEntry {
                info: info.clone(),
                branches,
            },
        );

        tracing::info!(
            repository = name,
            storage_namespace = %info.storage_namespace,
            "repository created"
        );
        Ok(info)
    }

    fn find_repository(&self, name: &str) -> CatalogResult<Option<RepositoryInfo>> {
        Ok(self.read()?.get(name).map(|entry| entry.info.clone()))
    }

    fn list_repositories(&self) -> CatalogResult<Vec<RepositoryInfo>> {
        let mut result: Vec<RepositoryInfo> =
            self.read()?.values().map(|entry| entry.info.clone()).collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn create_branch(&self, repository: &str, branch: &str) -> CatalogResult<BranchInfo> {
        validate_branch_name(branch)?;

        let mut repos = self.write()?;
        let entry = repos
            .get_mut(repository)
            .ok_or_else(|| repository_not_found(repository))?;
        if entry.branches.contains_key(branch) {
            return Err(CatalogError::BranchExists {
                repository: repository.to_string(),
                branch: branch.to_string(),
            });
        }

        let branch_entry = BranchEntry::new(repository, branch);
        let info = branch_entry.info();
        entry.branches.insert(branch.to_string(), branch_entry);

        tracing::info!(repository, branch, incarnation = %info.incarnation, "branch created");
        Ok(info)
    }

    fn find_branch_state(
        &self,
        repository: &str,
        branch: &str,
    ) -> CatalogResult<Option<Arc<BranchStagingState>>> {
        let repos = self.read()?;
        let entry = repos
            .get(repository)
            .ok_or_else(|| repository_not_found(repository))?;
        Ok(entry.branches.get(branch).map(|b| Arc::clone(&b.state)))
    }

    fn delete_branch(&self, repository: &str, branch: &str) -> CatalogResult<Arc<BranchStagingState>> {
        let mut repos = self.write()?;
        let entry = repos
            .get_mut(repository)
            .ok_or_else(|| repository_not_found(repository))?;
        if entry.info.default_branch == branch {
            return Err(CatalogError::DeleteDefaultBranch {
                repository: repository.to_string(),
                branch: branch.to_string(),
            });
        }
        let removed = entry
            .branches
            .remove(branch)
            .ok_or_else(|| CatalogError::BranchNotFound {
                repository: repository.to_string(),
                branch: branch.to_string(),
            })?;
        removed.state.mark_deleted();

        tracing::info!(repository, branch, "branch deleted");
        Ok(removed.state)
    }

    fn list_branches(&self, repository: &str) -> CatalogResult<Vec<BranchInfo>> {
        let repos = self.read()?;
        let entry = repos
            .get(repository)
            .ok_or_else(|| repository_not_found(repository))?;
        let mut result: Vec<BranchInfo> = entry.branches.values().map(BranchEntry::info).collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }
}
