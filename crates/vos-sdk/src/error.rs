use thiserror::Error;
use vos_protocol::ProtocolError;
use vos_staging::StagingError;
use vos_types::StagingLocation;

#[derive(Debug, Error)]
pub enum SdkError {
    /// The staging token expired. Write to `hint` and link again.
    #[error("staging token expired; retry at {}", .hint.physical_address)]
    Conflict { hint: StagingLocation },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("unsupported physical address: {0}")]
    UnsupportedAddress(String),

    #[error("gave up after {attempts} attempts, each answered with a conflict")]
    RetriesExhausted { attempts: u32 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("protocol error: {0}")]
    Protocol(ProtocolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SdkError {
    /// Returns `true` if allocate/write/link can be re-run and succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn conflict_hint(&self) -> Option<&StagingLocation> {
        match self {
            Self::Conflict { hint } => Some(hint),
            _ => None,
        }
    }
}

impl From<ProtocolError> for SdkError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::RemoteError { status: 404, message, .. } => Self::NotFound(message),
            ProtocolError::RemoteError { status: 400, message, .. } => Self::InvalidRequest(message),
            ProtocolError::RemoteError { status: 401 | 403, message, .. } => {
                Self::Unauthorized(message)
            }
            other => Self::Protocol(other),
        }
    }
}

impl From<StagingError> for SdkError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::Conflict { hint } => Self::Conflict { hint },
            err if err.is_not_found() => Self::NotFound(err.to_string()),
            err @ (StagingError::InvalidPath(_)
            | StagingError::InvalidMetadata(_)
            | StagingError::Catalog(_)) => Self::InvalidRequest(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
