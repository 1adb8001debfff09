//! HTTP wire protocol for the versioned object store.
//!
//! Defines the endpoint paths, request/response bodies and JSON encoding
//! shared by the VOS server and its clients. Object bytes never travel over
//! this protocol; only staging locations and metadata do.

pub mod auth;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;

pub use auth::AuthMethod;
pub use codec::JsonCodec;
pub use endpoint::{endpoints, HealthResponse, InfoResponse};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    capabilities, BranchInfo, CommitResponse, CreateBranchRequest, CreateRepositoryRequest,
    ErrorBody, PathQuery, RepositoryInfo, PROTOCOL_VERSION,
};
