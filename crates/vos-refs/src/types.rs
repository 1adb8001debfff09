//! Catalog record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A repository and where its objects are stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Repository name (e.g. "r1").
    pub name: String,
    /// URI prefix under which all physical addresses are allocated
    /// (e.g. "s3://bucket/r1").
    pub storage_namespace: String,
    /// Branch created together with the repository.
    pub default_branch: String,
    pub creation_date: DateTime<Utc>,
}

/// Summary information about a branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub repository: String,
    pub name: String,
    /// Current staging generation.
    pub generation: u64,
    /// Id of this incarnation of the branch name.
    pub incarnation: Uuid,
    pub creation_date: DateTime<Utc>,
}
