//! Client SDK for the versioned object store.
//!
//! Uploading an object is three steps: allocate a staging location, write
//! the bytes to its physical address, link the location to a logical path.
//! [`StagedUploader`] runs them and heals the one race the protocol has (a
//! commit between allocate and link) by retrying at the location the server
//! returns with the conflict.
//!
//! # Modules
//!
//! - [`transport`]: The [`StagingTransport`] trait
//! - [`http`]: [`HttpTransport`], a `reqwest` client for a remote server
//! - [`local`]: [`LocalTransport`], an in-process staging service
//! - [`writer`]: [`ObjectWriter`] implementations for the byte upload
//! - [`uploader`]: [`StagedUploader`]
//! - [`config`]: [`ClientConfig`]

pub mod config;
pub mod error;
pub mod http;
pub mod local;
pub mod transport;
pub mod uploader;
pub mod writer;

pub use config::ClientConfig;
pub use error::{SdkError, SdkResult};
pub use http::HttpTransport;
pub use local::LocalTransport;
pub use transport::StagingTransport;
pub use uploader::{checksum, StagedUploader, UploadOptions, UploadOutcome};
pub use writer::{LocalFsWriter, MemoryObjectWriter, ObjectWriter, LOCAL_SCHEME};

// Re-export key types
pub use vos_protocol::CommitResponse;
pub use vos_types::{ObjectStats, StagingLocation, StagingMetadata};
