//! HTTP server for the versioned object store.
//!
//! Serves the staging-ingest protocol over HTTP: clients allocate a staging
//! location, write bytes to it out-of-band, then link it to a logical path.
//! A link with a stale token is answered with `409 Conflict` whose body is
//! the location to retry at.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{
    provider_from_config, Action, AllowAllAuth, AuthProvider, Credentials, Identity,
    StaticTokenAuth,
};
pub use config::{AuthConfig, RepositoryConfig, ServerConfig, TokenConfig};
pub use error::{ServerError, ServerResult};
pub use router::{build_router, AppState};
pub use server::VosServer;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde::de::DeserializeOwned;
    use tower::util::ServiceExt;
    use vos_protocol::{endpoints, CommitResponse, ErrorBody};
    use vos_types::{ObjectStats, StagingLocation, StagingMetadata};

    fn config() -> ServerConfig {
        ServerConfig {
            repositories: vec![RepositoryConfig {
                name: "r1".into(),
                storage_namespace: "mem://r1".into(),
                default_branch: "main".into(),
            }],
            ..ServerConfig::default()
        }
    }

    fn app() -> Router {
        VosServer::new(config()).unwrap().router()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn send_json(method: &str, uri: &str, body: &impl serde::Serialize) -> Request<Body> {
        let bytes = serde_json::to_vec(body).unwrap();
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("content-length", bytes.len())
            .body(Body::from(bytes))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, bytes::Bytes) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body)
    }

    fn decode<T: DeserializeOwned>(body: &[u8]) -> T {
        serde_json::from_slice(body).unwrap()
    }

    fn backing(path: &str) -> String {
        format!("{}?path={path}", endpoints::staging_backing("r1", "main"))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, _) = call(&app(), get(endpoints::HEALTH)).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn info_endpoint() {
        let (status, body) = call(&app(), get(endpoints::INFO)).await;
        assert_eq!(status, 200);
        let info: vos_protocol::InfoResponse = decode(&body);
        assert!(info.supports(vos_protocol::capabilities::STAGING_V1));
    }

    #[tokio::test]
    async fn allocate_then_link() {
        let app = app();
        let (status, body) = call(&app, get(&backing("a.txt"))).await;
        assert_eq!(status, 200);
        let loc: StagingLocation = decode(&body);

        let metadata = StagingMetadata::new(loc.clone(), "abc", 10);
        let (status, body) = call(&app, send_json("PUT", &backing("a.txt"), &metadata)).await;
        assert_eq!(status, 200);
        let stats: ObjectStats = decode(&body);
        assert_eq!(stats.physical_address, loc.physical_address);

        let stat_uri = format!("{}?path=a.txt", endpoints::object_stat("r1", "main"));
        let (status, body) = call(&app, get(&stat_uri)).await;
        assert_eq!(status, 200);
        assert_eq!(decode::<ObjectStats>(&body), stats);
    }

    #[tokio::test]
    async fn stale_link_is_409_with_location() {
        let app = app();
        let (_, body) = call(&app, get(&backing("a.txt"))).await;
        let loc: StagingLocation = decode(&body);

        let (status, body) = call(&app, post_empty(&endpoints::commits("r1", "main"))).await;
        assert_eq!(status, 200);
        assert_eq!(decode::<CommitResponse>(&body).generation, 2);

        let metadata = StagingMetadata::new(loc.clone(), "abc", 10);
        let (status, body) = call(&app, send_json("PUT", &backing("a.txt"), &metadata)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let hint: StagingLocation = decode(&body);
        assert_ne!(hint.physical_address, loc.physical_address);

        let retry = StagingMetadata::new(hint, "abc", 10);
        let (status, _) = call(&app, send_json("PUT", &backing("a.txt"), &retry)).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn path_query_is_percent_decoded() {
        let app = app();
        let (status, body) = call(&app, get(&backing("dir%2Fa%20b.txt"))).await;
        assert_eq!(status, 200);
        let loc: StagingLocation = decode(&body);
        let metadata = StagingMetadata::new(loc, "abc", 10);
        let (_, body) = call(&app, send_json("PUT", &backing("dir%2Fa%20b.txt"), &metadata)).await;
        assert_eq!(decode::<ObjectStats>(&body).path, "dir/a b.txt");
    }

    #[tokio::test]
    async fn unknown_branch_is_404_error_body() {
        let uri = format!("{}?path=a", endpoints::staging_backing("r1", "dev"));
        let (status, body) = call(&app(), get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(decode::<ErrorBody>(&body).code, "branch_not_found");
    }

    #[tokio::test]
    async fn malformed_metadata_is_400() {
        let app = app();
        let (_, body) = call(&app, get(&backing("a"))).await;
        let loc: StagingLocation = decode(&body);
        let metadata = StagingMetadata::new(loc, "", 10);
        let (status, body) = call(&app, send_json("PUT", &backing("a"), &metadata)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(decode::<ErrorBody>(&body).code, "invalid_metadata");
    }

    #[tokio::test]
    async fn link_body_missing_checksum_is_invalid_metadata() {
        let app = app();
        let (_, body) = call(&app, get(&backing("a"))).await;
        let loc: StagingLocation = decode(&body);
        let partial = serde_json::json!({ "staging": loc, "size_bytes": 10 });
        let (status, body) = call(&app, send_json("PUT", &backing("a"), &partial)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorBody = decode(&body);
        assert_eq!(error.code, "invalid_metadata");
        assert!(error.message.contains("checksum"));
    }

    #[tokio::test]
    async fn missing_path_query_is_400_error_body() {
        let uri = endpoints::staging_backing("r1", "main");
        let (status, body) = call(&app(), get(&uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(decode::<ErrorBody>(&body).code, "bad_request");

        let branch = serde_json::json!({ "title": "dev" });
        let (status, body) = call(&app(), send_json("POST", &endpoints::branches("r1"), &branch)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(decode::<ErrorBody>(&body).code, "bad_request");
    }

    #[tokio::test]
    async fn location_cannot_back_a_second_path() {
        let app = app();
        let (_, body) = call(&app, get(&backing("a.txt"))).await;
        let loc: StagingLocation = decode(&body);
        let metadata = StagingMetadata::new(loc, "abc", 10);

        let (status, _) = call(&app, send_json("PUT", &backing("a.txt"), &metadata)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, send_json("PUT", &backing("b.txt"), &metadata)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(decode::<ErrorBody>(&body).code, "invalid_metadata");

        let stat_uri = format!("{}?path=b.txt", endpoints::object_stat("r1", "main"));
        assert_eq!(call(&app, get(&stat_uri)).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn repository_and_branch_lifecycle() {
        let app = app();
        let req = vos_protocol::CreateRepositoryRequest {
            name: "r2".into(),
            storage_namespace: "mem://r2".into(),
            default_branch: "main".into(),
        };
        let (status, _) = call(&app, send_json("POST", endpoints::REPOSITORIES, &req)).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(&app, send_json("POST", endpoints::REPOSITORIES, &req)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let branch = vos_protocol::CreateBranchRequest { name: "dev".into() };
        let (status, _) = call(&app, send_json("POST", &endpoints::branches("r2"), &branch)).await;
        assert_eq!(status, StatusCode::CREATED);

        let delete = |uri: String| {
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = call(&app, delete(endpoints::branch("r2", "dev"))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, delete(endpoints::branch("r2", "main"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unstage_missing_object_is_404() {
        let uri = format!("{}?path=nope", endpoints::objects("r1", "main"));
        let req = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&app(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let config = ServerConfig {
            max_body_bytes: 64,
            ..config()
        };
        let app = VosServer::new(config).unwrap().router();
        let (_, body) = call(&app, get(&backing("a"))).await;
        let loc: StagingLocation = decode(&body);
        let metadata =
            StagingMetadata::new(loc, "abc", 10).with_user_metadata("padding", "x".repeat(256));
        let (status, _) = call(&app, send_json("PUT", &backing("a"), &metadata)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn tokens_gate_writes() {
        let mut config = config();
        config.auth = AuthConfig {
            allow_anonymous: true,
            tokens: vec![TokenConfig {
                token: "ci-token".into(),
                identity: "ci".into(),
                admin: false,
            }],
        };
        let app = VosServer::new(config).unwrap().router();

        let (status, _) = call(&app, get(&backing("a"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let bad = Request::builder()
            .uri(backing("a"))
            .header("authorization", "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(&app, bad).await.0, StatusCode::UNAUTHORIZED);

        let good = Request::builder()
            .uri(backing("a"))
            .header("authorization", "Bearer ci-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(&app, good).await.0, StatusCode::OK);
    }
}
