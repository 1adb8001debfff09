use serde::{Deserialize, Serialize};

use crate::message::{capabilities, PROTOCOL_VERSION};

/// HTTP endpoint paths for the VOS protocol.
///
/// The constants are route templates; the functions fill them in for a
/// concrete repository and branch. Logical object paths always travel in the
/// `path` query parameter, never in the URL path.
pub mod endpoints {
    pub const HEALTH: &str = "/v1/health";
    pub const INFO: &str = "/v1/info";
    pub const REPOSITORIES: &str = "/v1/repositories";
    pub const BRANCHES: &str = "/v1/repositories/:repository/branches";
    pub const BRANCH: &str = "/v1/repositories/:repository/branches/:branch";
    pub const STAGING_BACKING: &str =
        "/v1/repositories/:repository/branches/:branch/staging/backing";
    pub const OBJECT_STAT: &str = "/v1/repositories/:repository/branches/:branch/objects/stat";
    pub const OBJECTS: &str = "/v1/repositories/:repository/branches/:branch/objects";
    pub const COMMITS: &str = "/v1/repositories/:repository/branches/:branch/commits";

    pub fn branches(repository: &str) -> String {
        format!("{REPOSITORIES}/{repository}/branches")
    }

    pub fn branch(repository: &str, branch: &str) -> String {
        format!("{}/{branch}", branches(repository))
    }

    pub fn staging_backing(repository: &str, branch: &str) -> String {
        format!("{}/staging/backing", self::branch(repository, branch))
    }

    pub fn object_stat(repository: &str, branch: &str) -> String {
        format!("{}/stat", objects(repository, branch))
    }

    pub fn objects(repository: &str, branch: &str) -> String {
        format!("{}/objects", self::branch(repository, branch))
    }

    pub fn commits(repository: &str, branch: &str) -> String {
        format!("{}/commits", self::branch(repository, branch))
    }
}

/// Health check response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

/// Server description returned by the info endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub protocol_version: u32,
    pub capabilities: Vec<String>,
}

impl Default for InfoResponse {
    fn default() -> Self {
        Self {
            name: "vos".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: PROTOCOL_VERSION,
            capabilities: vec![
                capabilities::STAGING_V1.into(),
                capabilities::CONFLICT_HINT.into(),
            ],
        }
    }
}

impl InfoResponse {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}
