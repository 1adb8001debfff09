//! The staging service facade.
//!
//! [`StagingService`] wires a [`BranchCatalog`] to the allocator, the link
//! coordinator and the per-branch staging areas. It is what the server and
//! the in-process SDK transport talk to.

use std::sync::Arc;

use vos_refs::{BranchCatalog, BranchInfo, InMemoryBranchCatalog, RepositoryInfo};
use vos_types::{CommitSummary, ObjectStats, StagingLocation, StagingMetadata};

use crate::allocator::{validate_path, PhysicalAddressAllocator};
use crate::area::{StagingArea, StagingAreas};
use crate::config::StagingConfig;
use crate::coordinator::LinkCoordinator;
use crate::error::{StagingError, StagingResult};

/// Allocate, link, inspect and commit staged objects.
pub struct StagingService {
    catalog: Arc<dyn BranchCatalog>,
    allocator: Arc<PhysicalAddressAllocator>,
    coordinator: LinkCoordinator,
    areas: Arc<StagingAreas>,
}

impl StagingService {
    pub fn new(catalog: Arc<dyn BranchCatalog>, config: &StagingConfig) -> Self {
        let allocator = Arc::new(PhysicalAddressAllocator::new(Arc::clone(&catalog), config));
        let areas = Arc::new(StagingAreas::new(config.path_shards));
        let coordinator =
            LinkCoordinator::new(Arc::clone(&catalog), Arc::clone(&allocator), Arc::clone(&areas));
        Self {
            catalog,
            allocator,
            coordinator,
            areas,
        }
    }

    /// A service over a fresh [`InMemoryBranchCatalog`] with default config.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBranchCatalog::new()), &StagingConfig::default())
    }

    pub fn catalog(&self) -> &Arc<dyn BranchCatalog> {
        &self.catalog
    }

    /// Return a fresh physical address and staging token for `path`.
    pub fn allocate_staging_location(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> StagingResult<StagingLocation> {
        self.allocator.allocate(repository, branch, path)
    }

    /// Link a written object to `path`. See [`LinkCoordinator::link`].
    pub fn link_staging_location(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
        metadata: &StagingMetadata,
    ) -> StagingResult<ObjectStats> {
        self.coordinator.link(repository, branch, path, metadata)
    }

    /// The object currently staged at `path`.
    pub fn stat_object(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> StagingResult<ObjectStats> {
        validate_path(path)?;
        let staged = match self.existing_area(repository, branch)? {
            Some(area) => area.get(path)?,
            None => None,
        };
        staged.ok_or_else(|| StagingError::ObjectNotFound {
            repository: repository.to_string(),
            branch: branch.to_string(),
            path: path.to_string(),
        })
    }

    /// Drop the object staged at `path`. Returns `true` if one was staged.
    pub fn unstage(&self, repository: &str, branch: &str, path: &str) -> StagingResult<bool> {
        validate_path(path)?;
        let removed = match self.existing_area(repository, branch)? {
            Some(area) => area.remove(path)?,
            None => false,
        };
        if removed {
            tracing::debug!(repository, branch, path, "object unstaged");
        }
        Ok(removed)
    }

    /// Everything staged on the branch, sorted by path.
    pub fn list_staged(&self, repository: &str, branch: &str) -> StagingResult<Vec<ObjectStats>> {
        match self.existing_area(repository, branch)? {
            Some(area) => area.list(),
            None => Ok(Vec::new()),
        }
    }

    /// Commit the branch: bump its staging generation and take every staged
    /// object out of the staging area.
    ///
    /// Tokens issued before the bump stop validating as soon as it is
    /// visible. The drain runs while other committers of the branch are
    /// excluded, so each staged object lands in exactly one commit.
    pub fn commit(&self, repository: &str, branch: &str) -> StagingResult<CommitSummary> {
        let state = self.catalog.branch_state(repository, branch)?;
        let area = self.areas.area_for(&state)?;
        let (generation, objects) =
            state.commit_with(|generation| area.drain().map(|objects| (generation, objects)))??;

        tracing::info!(
            repository,
            branch,
            generation,
            objects = objects.len(),
            "branch committed"
        );
        Ok(CommitSummary {
            repository: repository.to_string(),
            branch: branch.to_string(),
            generation,
            objects,
        })
    }

    pub fn create_repository(
        &self,
        name: &str,
        storage_namespace: &str,
        default_branch: &str,
    ) -> StagingResult<RepositoryInfo> {
        Ok(self
            .catalog
            .create_repository(name, storage_namespace, default_branch)?)
    }

    pub fn list_repositories(&self) -> StagingResult<Vec<RepositoryInfo>> {
        Ok(self.catalog.list_repositories()?)
    }

    pub fn create_branch(&self, repository: &str, branch: &str) -> StagingResult<BranchInfo> {
        Ok(self.catalog.create_branch(repository, branch)?)
    }

    pub fn list_branches(&self, repository: &str) -> StagingResult<Vec<BranchInfo>> {
        Ok(self.catalog.list_branches(repository)?)
    }

    /// Delete a branch and drop everything staged on it.
    pub fn delete_branch(&self, repository: &str, branch: &str) -> StagingResult<()> {
        let state = self.catalog.delete_branch(repository, branch)?;
        if let Some(area) = self.areas.remove(state.incarnation())? {
            tracing::debug!(
                repository,
                branch,
                dropped = area.len()?,
                "staging area dropped"
            );
        }
        Ok(())
    }

    fn existing_area(
        &self,
        repository: &str,
        branch: &str,
    ) -> StagingResult<Option<Arc<StagingArea>>> {
        let state = self.catalog.branch_state(repository, branch)?;
        self.areas.get(state.incarnation())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    fn service() -> StagingService {
        let service = StagingService::in_memory();
        service.create_repository("r1", "mem://r1", "main").unwrap();
        service
    }

    fn metadata(loc: StagingLocation) -> StagingMetadata {
        StagingMetadata::new(loc, "abc", 10)
    }

    #[test]
    fn stale_link_is_answered_with_a_location_that_works() {
        let service = service();
        service.commit("r1", "main").unwrap();
        service.commit("r1", "main").unwrap();

        let loc = service.allocate_staging_location("r1", "main", "a.txt").unwrap();
        assert_eq!(loc.token.claims().unwrap().generation, 3);

        let summary = service.commit("r1", "main").unwrap();
        assert_eq!(summary.generation, 4);

        let err = service
            .link_staging_location("r1", "main", "a.txt", &metadata(loc.clone()))
            .unwrap_err();
        let hint = err.conflict_hint().cloned().expect("conflict carries a hint");
        assert_eq!(hint.token.claims().unwrap().generation, 4);
        assert_ne!(hint.physical_address, loc.physical_address);

        let stats = service
            .link_staging_location("r1", "main", "a.txt", &metadata(hint.clone()))
            .unwrap();
        assert_eq!(stats.physical_address, hint.physical_address);
        assert_eq!(stats.checksum, "abc");
        assert_eq!(stats.size_bytes, 10);
    }

    #[test]
    fn linked_object_is_immediately_visible() {
        let service = service();
        let loc = service.allocate_staging_location("r1", "main", "a.txt").unwrap();
        let stats = service
            .link_staging_location("r1", "main", "a.txt", &metadata(loc))
            .unwrap();
        assert_eq!(service.stat_object("r1", "main", "a.txt").unwrap(), stats);
        assert!(matches!(
            service.stat_object("r1", "main", "b.txt"),
            Err(StagingError::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn identical_link_twice_changes_nothing() {
        let service = service();
        let loc = service.allocate_staging_location("r1", "main", "a.txt").unwrap();
        let m = metadata(loc);
        let first = service.link_staging_location("r1", "main", "a.txt", &m).unwrap();
        let second = service.link_staging_location("r1", "main", "a.txt", &m).unwrap();
        assert_eq!(first, second);
        assert_eq!(service.list_staged("r1", "main").unwrap(), vec![first]);
    }

    #[test]
    fn concurrent_links_to_distinct_paths_all_succeed() {
        let service = Arc::new(service());
        let barrier = Arc::new(Barrier::new(64));
        let handles: Vec<_> = (0..64)
            .map(|i| {
                let service = Arc::clone(&service);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let path = format!("batch/{i:03}.parquet");
                    let loc = service.allocate_staging_location("r1", "main", &path).unwrap();
                    barrier.wait();
                    service
                        .link_staging_location("r1", "main", &path, &metadata(loc))
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        let staged = service.list_staged("r1", "main").unwrap();
        assert_eq!(staged.len(), 64);
        assert_eq!(staged[0].path, "batch/000.parquet");
    }

    #[test]
    fn commit_drains_staged_objects() {
        let service = service();
        for path in ["b", "a"] {
            let loc = service.allocate_staging_location("r1", "main", path).unwrap();
            service
                .link_staging_location("r1", "main", path, &metadata(loc))
                .unwrap();
        }
        let summary = service.commit("r1", "main").unwrap();
        assert_eq!(summary.generation, 2);
        let paths: Vec<&str> = summary.objects.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b"]);

        assert!(service.list_staged("r1", "main").unwrap().is_empty());
        assert!(service.commit("r1", "main").unwrap().is_empty());
    }

    #[test]
    fn unstage_removes_object() {
        let service = service();
        let loc = service.allocate_staging_location("r1", "main", "a").unwrap();
        service
            .link_staging_location("r1", "main", "a", &metadata(loc))
            .unwrap();
        assert!(service.unstage("r1", "main", "a").unwrap());
        assert!(!service.unstage("r1", "main", "a").unwrap());
        assert!(!service.unstage("r1", "main", "never").unwrap());
    }

    #[test]
    fn commits_interleaved_with_links_lose_nothing() {
        let service = Arc::new(service());
        let linker = {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for i in 0..200 {
                    let path = format!("f{i:03}");
                    let mut loc = service.allocate_staging_location("r1", "main", &path).unwrap();
                    loop {
                        match service.link_staging_location("r1", "main", &path, &metadata(loc)) {
                            Ok(_) => break,
                            Err(err) => {
                                loc = err.conflict_hint().cloned().expect("only conflicts expected")
                            }
                        }
                    }
                }
            })
        };
        let mut committed = Vec::new();
        for _ in 0..50 {
            committed.extend(service.commit("r1", "main").unwrap().objects);
        }
        linker.join().expect("thread should not panic");
        committed.extend(service.commit("r1", "main").unwrap().objects);

        let mut paths: Vec<String> = committed.into_iter().map(|o| o.path).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 200);
    }

    #[test]
    fn deleted_branch_drops_staging_and_old_tokens() {
        let service = service();
        service.create_branch("r1", "dev").unwrap();
        let loc = service.allocate_staging_location("r1", "dev", "a").unwrap();
        service
            .link_staging_location("r1", "dev", "a", &metadata(loc.clone()))
            .unwrap();

        service.delete_branch("r1", "dev").unwrap();
        assert!(matches!(
            service.list_staged("r1", "dev"),
            Err(StagingError::BranchNotFound { .. })
        ));

        service.create_branch("r1", "dev").unwrap();
        assert!(service.list_staged("r1", "dev").unwrap().is_empty());
        let err = service
            .link_staging_location("r1", "dev", "a", &metadata(loc))
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn lookups_fail_for_unknown_names() {
        let service = service();
        assert!(matches!(
            service.allocate_staging_location("nope", "main", "a"),
            Err(StagingError::RepositoryNotFound(_))
        ));
        assert!(matches!(
            service.commit("r1", "dev"),
            Err(StagingError::BranchNotFound { .. })
        ));
        assert!(matches!(
            service.create_repository("r1", "mem://again", "main"),
            Err(StagingError::Catalog(_))
        ));
    }
}
