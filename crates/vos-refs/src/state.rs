//! The per-branch staging generation register.
//!
//! [`BranchStagingState`] is a single-writer, many-reader register. Readers
//! (token issuance and validation) perform one atomic load and never block.
//! The commit path takes a mutex that only other committers contend on,
//! bumps the generation and runs its drain step while still holding it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use uuid::Uuid;
use vos_types::{BranchFingerprint, StagingToken, TokenClaims};

use crate::error::{CatalogError, CatalogResult};

/// Generation of a freshly created branch.
pub const INITIAL_GENERATION: u64 = 1;

/// Mutable staging state of one branch incarnation.
#[derive(Debug)]
pub struct BranchStagingState {
    repository: String,
    branch: String,
    incarnation: Uuid,
    fingerprint: BranchFingerprint,
    generation: AtomicU64,
    deleted: AtomicBool,
    commit_lock: Mutex<()>,
}

impl BranchStagingState {
    /// Create the state for a new branch incarnation at the given generation.
    pub fn new(
        repository: impl Into<String>,
        branch: impl Into<String>,
        incarnation: Uuid,
        generation: u64,
    ) -> Self {
        let repository = repository.into();
        let branch = branch.into();
        let fingerprint = BranchFingerprint::derive(&repository, &branch, &incarnation);
        Self {
            repository,
            branch,
            incarnation,
            fingerprint,
            generation: AtomicU64::new(generation),
            deleted: AtomicBool::new(false),
            commit_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Unique id of this incarnation of the branch.
    pub fn incarnation(&self) -> Uuid {
        self.incarnation
    }

    pub fn fingerprint(&self) -> BranchFingerprint {
        self.fingerprint
    }

    /// The current staging generation, as one point-in-time read.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns `true` once the branch has been deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Issue claims for a new token under the current generation, bound to
    /// `physical_address`.
    ///
    /// The generation is read before the deleted flag so a deletion that lands
    /// concurrently is never missed.
    pub fn issue_claims(&self, physical_address: &str) -> CatalogResult<TokenClaims> {
        let generation = self.current_generation();
        if self.is_deleted() {
            return Err(self.deleted_error());
        }
        Ok(TokenClaims::fresh(self.fingerprint, generation, physical_address))
    }

    /// Returns `true` iff `token` was issued for this branch incarnation under
    /// the current generation. Malformed tokens never validate.
    pub fn validate_token(&self, token: &StagingToken) -> bool {
        token
            .claims()
            .map(|claims| self.validate_claims(&claims))
            .unwrap_or(false)
    }

    /// Compare already-decoded claims against the current generation.
    pub fn validate_claims(&self, claims: &TokenClaims) -> bool {
        if claims.fingerprint != self.fingerprint {
            return false;
        }
        let generation = self.current_generation();
        claims.generation == generation && !self.is_deleted()
    }

    /// Run the exclusive commit step: bump the generation, then call `f` with
    /// the new generation while still excluding other committers.
    ///
    /// Once the bump is visible no token of an older generation validates.
    pub fn commit_with<T>(&self, f: impl FnOnce(u64) -> T) -> CatalogResult<T> {
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|e| CatalogError::LockPoisoned(e.to_string()))?;
        if self.is_deleted() {
            return Err(self.deleted_error());
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            repository = %self.repository,
            branch = %self.branch,
            generation,
            "staging generation bumped"
        );
        Ok(f(generation))
    }

    /// Mark this incarnation deleted. Idempotent.
    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::SeqCst);
    }

    fn deleted_error(&self) -> CatalogError {
        CatalogError::BranchDeleted {
            repository: self.repository.clone(),
            branch: self.branch.clone(),
        }
    }
}
