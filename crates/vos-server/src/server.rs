use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use vos_refs::{BranchCatalog, InMemoryBranchCatalog};
use vos_staging::StagingService;

use crate::auth::provider_from_config;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// VOS staging server.
pub struct VosServer {
    config: ServerConfig,
    state: AppState,
}

impl VosServer {
    /// Build a server over a fresh in-memory catalog and create the
    /// configured bootstrap repositories.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let catalog: Arc<dyn BranchCatalog> = Arc::new(InMemoryBranchCatalog::new());
        let service = Arc::new(StagingService::new(catalog, &config.staging));
        for repo in &config.repositories {
            service
                .create_repository(&repo.name, &repo.storage_namespace, &repo.default_branch)
                .map_err(|e| ServerError::Config(format!("repository {}: {e}", repo.name)))?;
        }
        let state = AppState::new(service, provider_from_config(&config.auth));
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<StagingService> {
        &self.state.service
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_body_bytes)
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ServerResult<()> {
        let addr: SocketAddr = listener.local_addr()?;
        let app = self.router();
        tracing::info!(
            %addr,
            repositories = self.config.repositories.len(),
            open = self.config.auth.is_open(),
            "VOS server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!(%addr, "VOS server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryConfig;

    #[test]
    fn server_construction() {
        let server = VosServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8000".parse().unwrap());
        assert!(server.service().list_repositories().unwrap().is_empty());
    }

    #[test]
    fn bootstrap_repositories_are_created() {
        let config = ServerConfig {
            repositories: vec![RepositoryConfig {
                name: "r1".into(),
                storage_namespace: "mem://r1".into(),
                default_branch: "main".into(),
            }],
            ..ServerConfig::default()
        };
        let server = VosServer::new(config).unwrap();
        let branches = server.service().list_branches("r1").unwrap();
        assert_eq!(branches[0].name, "main");
    }

    #[test]
    fn bad_bootstrap_repository_is_config_error() {
        let config = ServerConfig {
            repositories: vec![RepositoryConfig {
                name: "r1".into(),
                storage_namespace: "no-scheme".into(),
                default_branch: "main".into(),
            }],
            ..ServerConfig::default()
        };
        assert!(matches!(VosServer::new(config), Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn serves_until_shutdown() {
        let server = VosServer::new(ServerConfig::default()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(listener, async {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
