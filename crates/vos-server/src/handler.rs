//! Request handlers.
//!
//! Every handler authenticates the caller, checks the action against the
//! auth provider, then calls into the [`StagingService`](vos_staging::StagingService).
//! Service calls hold only short in-memory locks and run inline.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use vos_protocol::{
    CommitResponse, CreateBranchRequest, CreateRepositoryRequest, HealthResponse, InfoResponse,
    PathQuery,
};
use vos_refs::{BranchInfo, RepositoryInfo};
use vos_staging::StagingError;
use vos_types::{ObjectStats, StagingLocation, StagingMetadata};

use crate::auth::{Action, Credentials, Identity};
use crate::error::{ServerError, ServerResult};
use crate::router::AppState;

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler() -> Json<InfoResponse> {
    Json(InfoResponse::default())
}

fn path_query(query: Result<Query<PathQuery>, QueryRejection>) -> ServerResult<String> {
    query
        .map(|Query(q)| q.path)
        .map_err(|rejection| ServerError::BadRequest(rejection.body_text()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ServerResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(rejection.body_text())
        } else {
            ServerError::BadRequest(rejection.body_text())
        }
    })
}

async fn authorize(state: &AppState, headers: &HeaderMap, action: Action) -> ServerResult<Identity> {
    let credentials = Credentials::from_headers(headers)?;
    let identity = state.auth.authenticate(&credentials).await?;
    if !state.auth.authorize(&identity, &action).await? {
        return Err(ServerError::AuthorizationDenied {
            identity: identity.name,
            action: action.to_string(),
        });
    }
    Ok(identity)
}

pub async fn list_repositories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<RepositoryInfo>>> {
    authorize(&state, &headers, Action::Read { repo: "*".into() }).await?;
    Ok(Json(state.service.list_repositories()?))
}

pub async fn create_repository(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateRepositoryRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<RepositoryInfo>)> {
    let identity = authorize(&state, &headers, Action::CreateRepo).await?;
    let req = json_body(body)?;
    let info = state
        .service
        .create_repository(&req.name, &req.storage_namespace, &req.default_branch)?;
    tracing::info!(repository = %info.name, identity = %identity.name, "repository created via api");
    Ok((StatusCode::CREATED, Json(info)))
}

pub async fn list_branches(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(repository): Path<String>,
) -> ServerResult<Json<Vec<BranchInfo>>> {
    authorize(&state, &headers, Action::Read { repo: repository.clone() }).await?;
    Ok(Json(state.service.list_branches(&repository)?))
}

pub async fn create_branch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(repository): Path<String>,
    body: Result<Json<CreateBranchRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<BranchInfo>)> {
    authorize(&state, &headers, Action::Write { repo: repository.clone() }).await?;
    let req = json_body(body)?;
    let info = state.service.create_branch(&repository, &req.name)?;
    Ok((StatusCode::CREATED, Json(info)))
}

pub async fn delete_branch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((repository, branch)): Path<(String, String)>,
) -> ServerResult<StatusCode> {
    authorize(&state, &headers, Action::Admin { repo: repository.clone() }).await?;
    state.service.delete_branch(&repository, &branch)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET .../staging/backing?path=`: allocate a staging location.
pub async fn get_staging_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((repository, branch)): Path<(String, String)>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> ServerResult<Json<StagingLocation>> {
    authorize(&state, &headers, Action::Write { repo: repository.clone() }).await?;
    let path = path_query(query)?;
    let location = state
        .service
        .allocate_staging_location(&repository, &branch, &path)?;
    Ok(Json(location))
}

/// `PUT .../staging/backing?path=`: link a written object. A stale token is
/// answered with 409 and a fresh location. A body that does not decode as
/// staging metadata is invalid metadata.
pub async fn link_staging_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((repository, branch)): Path<(String, String)>,
    query: Result<Query<PathQuery>, QueryRejection>,
    body: Result<Json<StagingMetadata>, JsonRejection>,
) -> ServerResult<Json<ObjectStats>> {
    authorize(&state, &headers, Action::Write { repo: repository.clone() }).await?;
    let path = path_query(query)?;
    let metadata = json_body(body).map_err(|err| match err {
        ServerError::BadRequest(reason) => ServerError::from(StagingError::InvalidMetadata(reason)),
        other => other,
    })?;
    let stats = state
        .service
        .link_staging_location(&repository, &branch, &path, &metadata)?;
    Ok(Json(stats))
}

pub async fn stat_object(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((repository, branch)): Path<(String, String)>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> ServerResult<Json<ObjectStats>> {
    authorize(&state, &headers, Action::Read { repo: repository.clone() }).await?;
    let path = path_query(query)?;
    Ok(Json(state.service.stat_object(&repository, &branch, &path)?))
}

pub async fn delete_object(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((repository, branch)): Path<(String, String)>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> ServerResult<StatusCode> {
    authorize(&state, &headers, Action::Write { repo: repository.clone() }).await?;
    let path = path_query(query)?;
    if !state.service.unstage(&repository, &branch, &path)? {
        return Err(StagingError::ObjectNotFound {
            repository,
            branch,
            path,
        }
        .into());
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn commit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((repository, branch)): Path<(String, String)>,
) -> ServerResult<Json<CommitResponse>> {
    authorize(&state, &headers, Action::Write { repo: repository.clone() }).await?;
    Ok(Json(state.service.commit(&repository, &branch)?))
}
