//! Token-fenced linking of staged objects.
//!
//! A link is accepted iff its token was issued under the branch's current
//! staging generation together with the physical address being linked, and
//! the location has not already been linked elsewhere. A stale link is answered with a conflict that
//! carries a fresh location, so the client rewrites and relinks without a
//! separate allocate call. No lock is held between allocation and link.
//!
//! A commit that lands after a link validated its token but before it
//! installed is tolerated: the object stays staged for the next commit.

use std::sync::Arc;

use chrono::Utc;
use vos_refs::BranchCatalog;
use vos_types::{ObjectStats, StagingMetadata};

use crate::advisor::ConflictAdvisor;
use crate::allocator::{validate_path, PhysicalAddressAllocator};
use crate::area::{InstallOutcome, StagingAreas};
use crate::error::{StagingError, StagingResult};

/// Validates link requests and installs linked objects.
pub struct LinkCoordinator {
    catalog: Arc<dyn BranchCatalog>,
    allocator: Arc<PhysicalAddressAllocator>,
    advisor: ConflictAdvisor,
    areas: Arc<StagingAreas>,
}

impl LinkCoordinator {
    pub fn new(
        catalog: Arc<dyn BranchCatalog>,
        allocator: Arc<PhysicalAddressAllocator>,
        areas: Arc<StagingAreas>,
    ) -> Self {
        Self {
            advisor: ConflictAdvisor::new(Arc::clone(&allocator)),
            catalog,
            allocator,
            areas,
        }
    }

    /// Link the object described by `metadata` to `path`.
    ///
    /// Returns the installed stats, or [`StagingError::Conflict`] with a
    /// fresh location if the token's generation is no longer current.
    /// Repeating an identical link under a still valid token returns the same
    /// stats without changing anything.
    pub fn link(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
        metadata: &StagingMetadata,
    ) -> StagingResult<ObjectStats> {
        validate_path(path)?;
        metadata.validate()?;

        let repo = self.catalog.repository(repository)?;
        if !self
            .allocator
            .owns_address(&repo.storage_namespace, &metadata.staging.physical_address)
        {
            return Err(StagingError::InvalidMetadata(format!(
                "physical address {} is outside the storage namespace of {repository}",
                metadata.staging.physical_address
            )));
        }
        let claims = metadata.staging.token.claims()?;
        if !claims.binds(&metadata.staging.physical_address) {
            return Err(StagingError::InvalidMetadata(format!(
                "staging token was not issued for {}",
                metadata.staging.physical_address
            )));
        }
        let state = self.catalog.branch_state(repository, branch)?;

        if !state.validate_claims(&claims) {
            tracing::debug!(
                repository,
                branch,
                path,
                token_generation = claims.generation,
                current_generation = state.current_generation(),
                "staging token rejected"
            );
            let hint = self.advisor.advise_on_conflict(repository, branch, path)?;
            return Err(StagingError::Conflict { hint });
        }

        let area = self.areas.area_for(&state)?;
        let (stats, outcome) = area.install(path, metadata, Utc::now().timestamp())?;

        match outcome {
            InstallOutcome::Unchanged => {
                tracing::debug!(repository, branch, path, "identical link already installed")
            }
            InstallOutcome::Created | InstallOutcome::Replaced => tracing::debug!(
                repository,
                branch,
                path,
                generation = claims.generation,
                physical_address = %stats.physical_address,
                replaced = outcome == InstallOutcome::Replaced,
                "object linked"
            ),
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StagingConfig;
    use vos_refs::InMemoryBranchCatalog;
    use vos_types::{StagingLocation, StagingToken};

    struct Fixture {
        catalog: Arc<dyn BranchCatalog>,
        allocator: Arc<PhysicalAddressAllocator>,
        areas: Arc<StagingAreas>,
        coordinator: LinkCoordinator,
    }

    fn fixture() -> Fixture {
        let catalog: Arc<dyn BranchCatalog> = Arc::new(InMemoryBranchCatalog::new());
        catalog.create_repository("r1", "mem://r1", "main").unwrap();
        let allocator = Arc::new(PhysicalAddressAllocator::new(
            Arc::clone(&catalog),
            &StagingConfig::default(),
        ));
        let areas = Arc::new(StagingAreas::new(8));
        let coordinator =
            LinkCoordinator::new(Arc::clone(&catalog), Arc::clone(&allocator), Arc::clone(&areas));
        Fixture {
            catalog,
            allocator,
            areas,
            coordinator,
        }
    }

    fn metadata(loc: StagingLocation) -> StagingMetadata {
        StagingMetadata::new(loc, "abc", 10)
    }

    #[test]
    fn valid_token_links_and_is_visible() {
        let f = fixture();
        let loc = f.allocator.allocate("r1", "main", "a.txt").unwrap();
        let stats = f
            .coordinator
            .link("r1", "main", "a.txt", &metadata(loc.clone()))
            .unwrap();
        assert_eq!(stats.physical_address, loc.physical_address);

        let state = f.catalog.branch_state("r1", "main").unwrap();
        let area = f.areas.get(state.incarnation()).unwrap().unwrap();
        assert_eq!(area.get("a.txt").unwrap(), Some(stats));
    }

    #[test]
    fn stale_token_conflicts_with_current_hint() {
        let f = fixture();
        let loc = f.allocator.allocate("r1", "main", "a.txt").unwrap();
        let state = f.catalog.branch_state("r1", "main").unwrap();
        state.commit_with(|_| ()).unwrap();

        let err = f
            .coordinator
            .link("r1", "main", "a.txt", &metadata(loc))
            .unwrap_err();
        let hint = err.conflict_hint().expect("conflict carries a hint");
        assert!(state.validate_token(&hint.token));
        assert!(f.areas.get(state.incarnation()).unwrap().is_none());
    }

    #[test]
    fn identical_relink_is_idempotent() {
        let f = fixture();
        let loc = f.allocator.allocate("r1", "main", "a.txt").unwrap();
        let m = metadata(loc);
        let first = f.coordinator.link("r1", "main", "a.txt", &m).unwrap();
        let second = f.coordinator.link("r1", "main", "a.txt", &m).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_metadata_is_terminal() {
        let f = fixture();
        let loc = f.allocator.allocate("r1", "main", "a.txt").unwrap();

        let mut no_checksum = metadata(loc.clone());
        no_checksum.checksum.clear();
        let err = f
            .coordinator
            .link("r1", "main", "a.txt", &no_checksum)
            .unwrap_err();
        assert!(matches!(err, StagingError::InvalidMetadata(_)));
        assert!(!err.is_retryable());

        let bad_token = metadata(StagingLocation::new(
            loc.physical_address.clone(),
            StagingToken::new("t@3"),
        ));
        assert!(matches!(
            f.coordinator.link("r1", "main", "a.txt", &bad_token),
            Err(StagingError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn location_is_consumed_by_its_first_link() {
        let f = fixture();
        let loc = f.allocator.allocate("r1", "main", "a.txt").unwrap();
        let m = metadata(loc);
        let linked = f.coordinator.link("r1", "main", "a.txt", &m).unwrap();

        let err = f.coordinator.link("r1", "main", "b.txt", &m).unwrap_err();
        assert!(matches!(err, StagingError::InvalidMetadata(_)));
        assert!(!err.is_retryable());

        let state = f.catalog.branch_state("r1", "main").unwrap();
        let area = f.areas.get(state.incarnation()).unwrap().unwrap();
        assert_eq!(area.get("b.txt").unwrap(), None);
        assert_eq!(f.coordinator.link("r1", "main", "a.txt", &m).unwrap(), linked);
    }

    #[test]
    fn token_must_match_its_address() {
        let f = fixture();
        let first = f.allocator.allocate("r1", "main", "c.txt").unwrap();
        let second = f.allocator.allocate("r1", "main", "d.txt").unwrap();
        let swapped = metadata(StagingLocation::new(second.physical_address, first.token));
        assert!(matches!(
            f.coordinator.link("r1", "main", "d.txt", &swapped),
            Err(StagingError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn foreign_address_is_rejected() {
        let f = fixture();
        let loc = f.allocator.allocate("r1", "main", "a.txt").unwrap();
        let foreign = metadata(StagingLocation::new("mem://elsewhere/data/00/x", loc.token));
        assert!(matches!(
            f.coordinator.link("r1", "main", "a.txt", &foreign),
            Err(StagingError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn token_from_another_branch_conflicts() {
        let f = fixture();
        f.catalog.create_branch("r1", "dev").unwrap();
        let loc = f.allocator.allocate("r1", "dev", "a.txt").unwrap();
        let err = f
            .coordinator
            .link("r1", "main", "a.txt", &metadata(loc))
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn token_from_previous_incarnation_conflicts() {
        let f = fixture();
        f.catalog.create_branch("r1", "dev").unwrap();
        let loc = f.allocator.allocate("r1", "dev", "a.txt").unwrap();
        f.catalog.delete_branch("r1", "dev").unwrap();
        f.catalog.create_branch("r1", "dev").unwrap();

        let err = f
            .coordinator
            .link("r1", "dev", "a.txt", &metadata(loc))
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn missing_branch_is_not_found() {
        let f = fixture();
        let loc = f.allocator.allocate("r1", "main", "a.txt").unwrap();
        let err = f
            .coordinator
            .link("r1", "nope", "a.txt", &metadata(loc))
            .unwrap_err();
        assert!(matches!(err, StagingError::BranchNotFound { .. }));
    }
}
