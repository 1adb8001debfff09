//! Error types for catalog operations.

use thiserror::Error;

/// Errors that can occur during repository and branch operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The repository does not exist.
    #[error("repository not found: {name}")]
    RepositoryNotFound { name: String },

    /// The branch does not exist in the repository.
    #[error("branch not found: {repository}/{branch}")]
    BranchNotFound { repository: String, branch: String },

    /// The branch was deleted while the operation was in flight.
    #[error("branch deleted: {repository}/{branch}")]
    BranchDeleted { repository: String, branch: String },

    /// A repository with this name already exists.
    #[error("repository already exists: {name}")]
    RepositoryExists { name: String },

    /// A branch with this name already exists.
    #[error("branch already exists: {repository}/{branch}")]
    BranchExists { repository: String, branch: String },

    /// The repository name is invalid.
    #[error("invalid repository name: {name}: {reason}")]
    InvalidRepositoryName { name: String, reason: String },

    /// The branch name is invalid.
    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// The storage namespace is not a usable URI.
    #[error("invalid storage namespace: {0}")]
    InvalidStorageNamespace(String),

    /// The repository's default branch cannot be deleted.
    #[error("cannot delete default branch: {repository}/{branch}")]
    DeleteDefaultBranch { repository: String, branch: String },

    /// A lock guarding catalog state was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl CatalogError {
    /// Returns `true` for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RepositoryNotFound { .. } | Self::BranchNotFound { .. } | Self::BranchDeleted { .. }
        )
    }
}

/// Convenience type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
