//! Foundation types for the versioned object store (VOS).
//!
//! This crate provides the data model of the staging-ingest protocol. Every
//! other VOS crate depends on `vos-types`.
//!
//! # Key Types
//!
//! - [`StagingToken`]: Opaque concurrency fence bound to a branch generation and one address
//! - [`TokenClaims`]: The decoded contents of a staging token
//! - [`BranchFingerprint`]: Short hash identifying one incarnation of a branch
//! - [`StagingLocation`]: A physical address plus the token that fences it
//! - [`StagingMetadata`]: The client's claim about an uploaded object
//! - [`ObjectStats`]: A linked logical object entry on a branch
//! - [`CommitSummary`]: The staged objects sealed by one branch commit

pub mod commit;
pub mod error;
pub mod location;
pub mod metadata;
pub mod stats;
pub mod token;

pub use commit::CommitSummary;
pub use error::TypeError;
pub use location::StagingLocation;
pub use metadata::StagingMetadata;
pub use stats::{ObjectStats, PathType};
pub use token::{address_digest, BranchFingerprint, StagingToken, TokenClaims};
