use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("version mismatch: local {local}, remote {remote}")]
    VersionMismatch { local: u32, remote: u32 },

    #[error("remote error: status={status}, code={code}, message={message}")]
    RemoteError {
        status: u16,
        code: String,
        message: String,
    },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
