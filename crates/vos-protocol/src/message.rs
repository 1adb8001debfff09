use serde::{Deserialize, Serialize};

pub use vos_refs::{BranchInfo, RepositoryInfo};
pub use vos_types::CommitSummary as CommitResponse;

pub const PROTOCOL_VERSION: u32 = 1;

/// Body of `POST /v1/repositories`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    pub storage_namespace: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".into()
}

/// Body of `POST /v1/repositories/:repository/branches`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
}

/// The `?path=` query parameter carrying a logical object path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

/// Error body for every failure except a link conflict, which answers with
/// the retry `StagingLocation` itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error kind, e.g. `branch_not_found`.
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub mod capabilities {
    /// Allocate/link staging endpoints.
    pub const STAGING_V1: &str = "staging-v1";
    /// Stale links are answered with a 409 carrying a fresh location.
    pub const CONFLICT_HINT: &str = "conflict-hint";
}
