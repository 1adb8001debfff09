use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use vos_staging::StagingConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Largest accepted request body. Bodies only carry metadata, never
    /// object bytes.
    pub max_body_bytes: usize,
    pub auth: AuthConfig,
    pub staging: StagingConfig,
    /// Repositories created when the server starts.
    pub repositories: Vec<RepositoryConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            max_body_bytes: 1024 * 1024,
            auth: AuthConfig::default(),
            staging: StagingConfig::default(),
            repositories: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}

/// Bearer-token authentication.
///
/// With no tokens and anonymous access allowed, the server is open to
/// everyone. Otherwise each request is matched against `tokens`, and
/// anonymous callers (if allowed) may only read.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub allow_anonymous: bool,
    pub tokens: Vec<TokenConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_anonymous: true,
            tokens: Vec::new(),
        }
    }
}

impl AuthConfig {
    pub fn is_open(&self) -> bool {
        self.allow_anonymous && self.tokens.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    /// Name the token authenticates as.
    pub identity: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub storage_namespace: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".into()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.max_body_bytes, 1024 * 1024);
        assert!(c.auth.is_open());
        assert!(c.repositories.is_empty());
        assert_eq!(c.staging, StagingConfig::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"

            [staging]
            path_shards = 8

            [[repositories]]
            name = "r1"
            storage_namespace = "local:///tmp/r1"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.staging.path_shards, 8);
        assert_eq!(c.staging.data_prefix, "data");
        assert_eq!(c.repositories[0].default_branch, "main");
        assert!(c.auth.allow_anonymous);
    }

    #[test]
    fn tokens_close_the_server() {
        let c = ServerConfig::from_toml_str(
            r#"
            [auth]
            allow_anonymous = true

            [[auth.tokens]]
            token = "s3cret"
            identity = "ci"
            "#,
        )
        .unwrap();
        assert!(!c.auth.is_open());
        assert!(!c.auth.tokens[0].admin);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = ServerConfig::from_toml_str("bind_addr = 12").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_body_bytes = 4096").unwrap();
        let c = ServerConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(c.max_body_bytes, 4096);
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = ServerConfig::default().to_toml_string().unwrap();
        let c = ServerConfig::from_toml_str(&text).unwrap();
        assert_eq!(c.bind_addr, ServerConfig::default().bind_addr);
    }
}
