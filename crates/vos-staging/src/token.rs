//! Staging token issuance.

use std::sync::Arc;

use vos_refs::{BranchCatalog, BranchStagingState};
use vos_types::StagingToken;

use crate::error::StagingResult;

/// Issues staging tokens bound to a branch's current staging generation and
/// to the physical address they are handed out with.
///
/// Issuing reads the generation once and never mutates it.
#[derive(Clone)]
pub struct StagingTokenIssuer {
    catalog: Arc<dyn BranchCatalog>,
}

impl StagingTokenIssuer {
    pub fn new(catalog: Arc<dyn BranchCatalog>) -> Self {
        Self { catalog }
    }

    /// Issue a token for `physical_address` under the current generation of
    /// `repository/branch`.
    pub fn issue(
        &self,
        repository: &str,
        branch: &str,
        physical_address: &str,
    ) -> StagingResult<StagingToken> {
        let state = self.catalog.branch_state(repository, branch)?;
        self.issue_for(&state, physical_address)
    }

    /// Issue a token for an already resolved branch.
    pub fn issue_for(
        &self,
        state: &BranchStagingState,
        physical_address: &str,
    ) -> StagingResult<StagingToken> {
        Ok(state.issue_claims(physical_address)?.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StagingError;
    use vos_refs::InMemoryBranchCatalog;

    const ADDRESS: &str = "mem://r1/data/00/a";

    fn issuer() -> (StagingTokenIssuer, Arc<dyn BranchCatalog>) {
        let catalog: Arc<dyn BranchCatalog> = Arc::new(InMemoryBranchCatalog::new());
        catalog.create_repository("r1", "mem://r1", "main").unwrap();
        (StagingTokenIssuer::new(Arc::clone(&catalog)), catalog)
    }

    #[test]
    fn issued_token_carries_current_generation() {
        let (issuer, catalog) = issuer();
        let state = catalog.branch_state("r1", "main").unwrap();
        state.commit_with(|_| ()).unwrap();
        state.commit_with(|_| ()).unwrap();

        let token = issuer.issue("r1", "main", ADDRESS).unwrap();
        let claims = token.claims().unwrap();
        assert_eq!(claims.generation, 3);
        assert!(claims.binds(ADDRESS));
        assert!(state.validate_token(&token));
    }

    #[test]
    fn issuing_does_not_bump() {
        let (issuer, catalog) = issuer();
        for _ in 0..5 {
            issuer.issue("r1", "main", ADDRESS).unwrap();
        }
        assert_eq!(catalog.branch_state("r1", "main").unwrap().current_generation(), 1);
    }

    #[test]
    fn unknown_branch_and_repository() {
        let (issuer, _) = issuer();
        assert!(matches!(
            issuer.issue("r1", "dev", ADDRESS),
            Err(StagingError::BranchNotFound { .. })
        ));
        assert!(matches!(
            issuer.issue("nope", "main", ADDRESS),
            Err(StagingError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn deleted_branch_held_by_caller() {
        let (issuer, catalog) = issuer();
        catalog.create_branch("r1", "dev").unwrap();
        let state = catalog.branch_state("r1", "dev").unwrap();
        catalog.delete_branch("r1", "dev").unwrap();
        assert!(matches!(
            issuer.issue_for(&state, ADDRESS),
            Err(StagingError::BranchDeleted { .. })
        ));
    }
}
