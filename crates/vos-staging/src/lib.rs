//! Staging-ingest protocol for the versioned object store.
//!
//! A client obtains a writable physical location for an object on a branch,
//! writes the bytes to underlying storage out-of-band, then links the
//! location to a logical path. No lock is held between the two calls: the
//! staging token handed out on allocation is a fence that stops validating
//! once the branch is committed, and a stale link is answered with a fresh
//! location instead of an error the client has to recover from by hand.
//!
//! # Key Types
//!
//! - [`StagingTokenIssuer`] -- Issues tokens bound to a branch generation
//! - [`PhysicalAddressAllocator`] -- Produces unique physical addresses
//! - [`StagingArea`] -- Per-branch path → object map with per-path exclusion
//! - [`LinkCoordinator`] -- Validates tokens and installs linked objects
//! - [`ConflictAdvisor`] -- Produces the retry location for stale links
//! - [`StagingService`] -- Facade tying the pieces to a branch catalog

pub mod advisor;
pub mod allocator;
pub mod area;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod service;
pub mod token;

pub use advisor::ConflictAdvisor;
pub use allocator::{validate_path, PhysicalAddressAllocator};
pub use area::{InstallOutcome, StagedEntry, StagingArea, StagingAreas};
pub use config::StagingConfig;
pub use coordinator::LinkCoordinator;
pub use error::{StagingError, StagingResult};
pub use service::StagingService;
pub use token::StagingTokenIssuer;
