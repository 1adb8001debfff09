//! Error types for the staging crate.

use vos_refs::CatalogError;
use vos_types::{StagingLocation, TypeError};

/// Errors that can occur during allocate, link and staging-area operations.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// The repository does not exist.
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    /// The branch does not exist in the repository.
    #[error("branch not found: {repository}/{branch}")]
    BranchNotFound { repository: String, branch: String },

    /// The branch was deleted while the request was in flight.
    #[error("branch deleted: {repository}/{branch}")]
    BranchDeleted { repository: String, branch: String },

    /// No object is staged at the path.
    #[error("object not found: {repository}/{branch}/{path}")]
    ObjectNotFound {
        repository: String,
        branch: String,
        path: String,
    },

    /// The logical path is unusable.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The staging metadata is malformed. This is a client bug and is not
    /// retryable.
    #[error("invalid staging metadata: {0}")]
    InvalidMetadata(String),

    /// The staging token expired because the branch was committed after it
    /// was issued. Write the object to `hint` and link again.
    #[error("staging token expired; retry at {}", .hint.physical_address)]
    Conflict { hint: StagingLocation },

    /// Any other catalog failure (name validation, duplicates).
    #[error("catalog error: {0}")]
    Catalog(CatalogError),

    /// A lock guarding staging state was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StagingError {
    /// Returns `true` if re-running allocate/upload/link can succeed. Only a
    /// conflict is retryable, and it carries the location to retry at.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RepositoryNotFound(_)
                | Self::BranchNotFound { .. }
                | Self::BranchDeleted { .. }
                | Self::ObjectNotFound { .. }
        )
    }

    /// The retry location carried by a conflict.
    pub fn conflict_hint(&self) -> Option<&StagingLocation> {
        match self {
            Self::Conflict { hint } => Some(hint),
            _ => None,
        }
    }
}

impl From<CatalogError> for StagingError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::RepositoryNotFound { name } => Self::RepositoryNotFound(name),
            CatalogError::BranchNotFound { repository, branch } => {
                Self::BranchNotFound { repository, branch }
            }
            CatalogError::BranchDeleted { repository, branch } => {
                Self::BranchDeleted { repository, branch }
            }
            CatalogError::LockPoisoned(msg) => Self::LockPoisoned(msg),
            other => Self::Catalog(other),
        }
    }
}

impl From<TypeError> for StagingError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidMetadata(reason) => Self::InvalidMetadata(reason),
            other => Self::InvalidMetadata(other.to_string()),
        }
    }
}

/// Convenience alias for staging results.
pub type StagingResult<T> = Result<T, StagingError>;
