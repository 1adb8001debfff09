use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::config::AuthConfig;
use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub is_admin: bool,
    /// Set only for callers that presented no credentials.
    anonymous: bool,
}

impl Identity {
    pub fn anonymous() -> Self { Self { name: "anonymous".into(), is_admin: false, anonymous: true } }
    pub fn user(name: impl Into<String>) -> Self { Self { name: name.into(), is_admin: false, anonymous: false } }
    pub fn admin(name: impl Into<String>) -> Self { Self { name: name.into(), is_admin: true, anonymous: false } }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read credentials from the `Authorization` header.
    pub fn from_headers(headers: &HeaderMap) -> ServerResult<Self> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(Self::Anonymous);
        };
        let value = value
            .to_str()
            .map_err(|_| ServerError::AuthFailed("authorization header is not ASCII".into()))?;
        match value.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
                Ok(Self::Bearer(token.trim().to_string()))
            }
            _ => Err(ServerError::AuthFailed("expected a bearer token".into())),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Action {
    /// Stat objects, list branches.
    Read { repo: String },
    /// Allocate, link, unstage, create branches, commit.
    Write { repo: String },
    /// Delete branches.
    Admin { repo: String },
    CreateRepo,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { repo } => write!(f, "read:{repo}"),
            Self::Write { repo } => write!(f, "write:{repo}"),
            Self::Admin { repo } => write!(f, "admin:{repo}"),
            Self::CreateRepo => write!(f, "create-repo"),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool>;
}

/// Build the provider described by `config`.
pub fn provider_from_config(config: &AuthConfig) -> Arc<dyn AuthProvider> {
    if config.is_open() {
        Arc::new(AllowAllAuth)
    } else {
        Arc::new(StaticTokenAuth::from_config(config))
    }
}

pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => Ok(Identity::user(format!("bearer:{}", &token[..8.min(token.len())]))),
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, _identity: &Identity, _action: &Action) -> ServerResult<bool> {
        Ok(true)
    }
}

/// Fixed bearer tokens from the server config.
///
/// Admins may do anything. Other token holders may read and write every
/// repository but not create repositories or delete branches. Anonymous
/// callers, when allowed at all, may only read.
pub struct StaticTokenAuth {
    tokens: HashMap<String, Identity>,
    allow_anonymous: bool,
}

impl StaticTokenAuth {
    pub fn from_config(config: &AuthConfig) -> Self {
        let tokens = config
            .tokens
            .iter()
            .map(|t| {
                let identity = if t.admin {
                    Identity::admin(&t.identity)
                } else {
                    Identity::user(&t.identity)
                };
                (t.token.clone(), identity)
            })
            .collect();
        Self {
            tokens,
            allow_anonymous: config.allow_anonymous,
        }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => self
                .tokens
                .get(token)
                .cloned()
                .ok_or_else(|| ServerError::AuthFailed("unknown token".into())),
            Credentials::Anonymous if self.allow_anonymous => Ok(Identity::anonymous()),
            Credentials::Anonymous => Err(ServerError::AuthFailed("credentials required".into())),
        }
    }

    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool> {
        if identity.is_admin {
            return Ok(true);
        }
        Ok(match action {
            Action::Read { .. } => true,
            Action::Write { .. } => !identity.is_anonymous(),
            Action::Admin { .. } | Action::CreateRepo => false,
        })
    }
}
