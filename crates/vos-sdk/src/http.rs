//! HTTP transport to a remote VOS server.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use vos_protocol::{
    endpoints, AuthMethod, BranchInfo, CommitResponse, CreateBranchRequest,
    CreateRepositoryRequest, HealthResponse, InfoResponse, JsonCodec, PathQuery, ProtocolError,
    RepositoryInfo, PROTOCOL_VERSION,
};
use vos_types::{ObjectStats, StagingLocation, StagingMetadata};

use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};
use crate::transport::StagingTransport;

/// Talks to a VOS server over HTTP with `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with the configured timeouts and bearer token.
    pub fn new(config: &ClientConfig) -> SdkResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let auth = AuthMethod::from_token(config.bearer_token.as_deref());
        if let Some(value) = auth.authorization_header() {
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| SdkError::Config(format!("invalid bearer token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        tracing::debug!(
            base_url = %config.base_url,
            auth = auth.display_name(),
            "HTTP transport ready"
        );
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn health(&self) -> SdkResult<HealthResponse> {
        read(self.client.get(self.url(endpoints::HEALTH)).send().await?).await
    }

    /// Fetch the server description, failing if it speaks another protocol
    /// version.
    pub async fn info(&self) -> SdkResult<InfoResponse> {
        let info: InfoResponse = read(self.client.get(self.url(endpoints::INFO)).send().await?).await?;
        if info.protocol_version != PROTOCOL_VERSION {
            return Err(SdkError::Protocol(ProtocolError::VersionMismatch {
                local: PROTOCOL_VERSION,
                remote: info.protocol_version,
            }));
        }
        Ok(info)
    }

    pub async fn create_repository(&self, req: &CreateRepositoryRequest) -> SdkResult<RepositoryInfo> {
        let resp = self
            .client
            .post(self.url(endpoints::REPOSITORIES))
            .json(req)
            .send()
            .await?;
        read(resp).await
    }

    pub async fn create_branch(&self, repository: &str, branch: &str) -> SdkResult<BranchInfo> {
        let resp = self
            .client
            .post(self.url(&endpoints::branches(repository)))
            .json(&CreateBranchRequest { name: branch.into() })
            .send()
            .await?;
        read(resp).await
    }

    pub async fn delete_branch(&self, repository: &str, branch: &str) -> SdkResult<()> {
        let resp = self
            .client
            .delete(self.url(&endpoints::branch(repository, branch)))
            .send()
            .await?;
        read_empty(resp).await
    }

    pub async fn unstage(&self, repository: &str, branch: &str, path: &str) -> SdkResult<()> {
        let resp = self
            .client
            .delete(self.url(&endpoints::objects(repository, branch)))
            .query(&path_query(path))
            .send()
            .await?;
        read_empty(resp).await
    }
}

fn path_query(path: &str) -> PathQuery {
    PathQuery { path: path.into() }
}

async fn read<T: DeserializeOwned>(resp: Response) -> SdkResult<T> {
    let status = resp.status();
    let body = resp.bytes().await?;
    if status.is_success() {
        return Ok(JsonCodec::decode(&body)?);
    }
    Err(JsonCodec::decode_error(status.as_u16(), &body).into())
}

async fn read_empty(resp: Response) -> SdkResult<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.bytes().await?;
    Err(JsonCodec::decode_error(status.as_u16(), &body).into())
}

#[async_trait]
impl StagingTransport for HttpTransport {
    async fn allocate(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
    ) -> SdkResult<StagingLocation> {
        let resp = self
            .client
            .get(self.url(&endpoints::staging_backing(repository, branch)))
            .query(&path_query(path))
            .send()
            .await?;
        read(resp).await
    }

    async fn link(
        &self,
        repository: &str,
        branch: &str,
        path: &str,
        metadata: &StagingMetadata,
    ) -> SdkResult<ObjectStats> {
        let resp = self
            .client
            .put(self.url(&endpoints::staging_backing(repository, branch)))
            .query(&path_query(path))
            .json(metadata)
            .send()
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            let body = resp.bytes().await?;
            return match JsonCodec::decode::<StagingLocation>(&body) {
                Ok(hint) => Err(SdkError::Conflict { hint }),
                Err(_) => Err(JsonCodec::decode_error(StatusCode::CONFLICT.as_u16(), &body).into()),
            };
        }
        read(resp).await
    }

    async fn stat(&self, repository: &str, branch: &str, path: &str) -> SdkResult<ObjectStats> {
        let resp = self
            .client
            .get(self.url(&endpoints::object_stat(repository, branch)))
            .query(&path_query(path))
            .send()
            .await?;
        read(resp).await
    }

    async fn commit(&self, repository: &str, branch: &str) -> SdkResult<CommitResponse> {
        let resp = self
            .client
            .post(self.url(&endpoints::commits(repository, branch)))
            .send()
            .await?;
        read(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let t = HttpTransport::new(&ClientConfig::new("http://127.0.0.1:9/")).unwrap();
        assert_eq!(t.url(endpoints::HEALTH), "http://127.0.0.1:9/v1/health");
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            HttpTransport::new(&ClientConfig::new("127.0.0.1:9")),
            Err(SdkError::Config(_))
        ));
        assert!(matches!(
            HttpTransport::new(&ClientConfig::default().with_bearer_token("bad\ntoken")),
            Err(SdkError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_http_error() {
        let t = HttpTransport::new(&ClientConfig::new("http://127.0.0.1:1")).unwrap();
        assert!(matches!(t.health().await, Err(SdkError::Http(_))));
    }
}
