use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use vos_protocol::ErrorBody;
use vos_refs::CatalogError;
use vos_staging::StagingError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("authorization denied: {identity} may not {action}")]
    AuthorizationDenied { identity: String, action: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::AuthFailed(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Self::AuthorizationDenied { .. } => (StatusCode::FORBIDDEN, "forbidden"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Self::Staging(err) => staging_status(err),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

fn staging_status(err: &StagingError) -> (StatusCode, &'static str) {
    match err {
        StagingError::RepositoryNotFound(_) => (StatusCode::NOT_FOUND, "repository_not_found"),
        StagingError::BranchNotFound { .. } => (StatusCode::NOT_FOUND, "branch_not_found"),
        StagingError::BranchDeleted { .. } => (StatusCode::NOT_FOUND, "branch_deleted"),
        StagingError::ObjectNotFound { .. } => (StatusCode::NOT_FOUND, "object_not_found"),
        StagingError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "invalid_path"),
        StagingError::InvalidMetadata(_) => (StatusCode::BAD_REQUEST, "invalid_metadata"),
        StagingError::Conflict { .. } => (StatusCode::CONFLICT, "staging_token_expired"),
        StagingError::Catalog(err) => catalog_status(err),
        StagingError::LockPoisoned(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

fn catalog_status(err: &CatalogError) -> (StatusCode, &'static str) {
    match err {
        CatalogError::RepositoryExists { .. } => (StatusCode::CONFLICT, "repository_exists"),
        CatalogError::BranchExists { .. } => (StatusCode::CONFLICT, "branch_exists"),
        CatalogError::InvalidRepositoryName { .. }
        | CatalogError::InvalidBranchName { .. }
        | CatalogError::InvalidStorageNamespace(_) => (StatusCode::BAD_REQUEST, "invalid_name"),
        CatalogError::DeleteDefaultBranch { .. } => {
            (StatusCode::BAD_REQUEST, "delete_default_branch")
        }
        CatalogError::RepositoryNotFound { .. } => (StatusCode::NOT_FOUND, "repository_not_found"),
        CatalogError::BranchNotFound { .. } => (StatusCode::NOT_FOUND, "branch_not_found"),
        CatalogError::BranchDeleted { .. } => (StatusCode::NOT_FOUND, "branch_deleted"),
        CatalogError::LockPoisoned(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        // A stale link answers with the location to retry at, not an ErrorBody.
        if let Self::Staging(StagingError::Conflict { hint }) = self {
            return (StatusCode::CONFLICT, Json(hint)).into_response();
        }

        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody::new(code, self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vos_types::{StagingLocation, StagingToken};

    #[test]
    fn not_found_family_is_404() {
        let err = ServerError::from(StagingError::BranchNotFound {
            repository: "r1".into(),
            branch: "dev".into(),
        });
        assert_eq!(err.status_and_code(), (StatusCode::NOT_FOUND, "branch_not_found"));
    }

    #[test]
    fn duplicates_are_409_and_bad_names_400() {
        let exists = ServerError::from(StagingError::Catalog(CatalogError::RepositoryExists {
            name: "r1".into(),
        }));
        assert_eq!(exists.status_and_code().0, StatusCode::CONFLICT);

        let bad = ServerError::from(StagingError::Catalog(CatalogError::InvalidStorageNamespace(
            "x".into(),
        )));
        assert_eq!(bad.status_and_code().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_response_is_409() {
        let err = ServerError::from(StagingError::Conflict {
            hint: StagingLocation::new("mem://r1/data/00/x", StagingToken::new("v1.t")),
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn rejected_requests_map_to_client_errors() {
        assert_eq!(
            ServerError::BadRequest("missing field `path`".into()).status_and_code(),
            (StatusCode::BAD_REQUEST, "bad_request")
        );
        assert_eq!(
            ServerError::PayloadTooLarge("length limit exceeded".into()).status_and_code(),
            (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
        );
    }

    #[test]
    fn auth_statuses() {
        assert_eq!(
            ServerError::AuthFailed("x".into()).status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
        let denied = ServerError::AuthorizationDenied {
            identity: "anonymous".into(),
            action: "write:r1".into(),
        };
        assert_eq!(denied.status_and_code().0, StatusCode::FORBIDDEN);
    }
}
