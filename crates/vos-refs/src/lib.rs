//! Repository and branch catalog for the versioned object store.
//!
//! This crate owns the branch-wide shared state of the staging protocol: the
//! per-branch staging generation that fences staging tokens. Everything else
//! (staging areas, allocation, linking) lives in `vos-staging`.
//!
//! # Architecture
//!
//! - **Repositories** have a name, a storage namespace under which physical
//!   addresses are allocated, and a default branch.
//! - **Branches** carry a [`BranchStagingState`]: an atomically readable
//!   generation counter bumped once per commit. Many allocate/link calls read
//!   it concurrently; only the commit path writes it.
//! - A branch that is deleted and recreated under the same name gets a new
//!   incarnation id, so tokens issued for the old incarnation never validate.
//!
//! # Modules
//!
//! - [`error`]: Error types for catalog operations
//! - [`types`]: [`RepositoryInfo`], [`BranchInfo`]
//! - [`state`]: [`BranchStagingState`], the generation register
//! - [`traits`]: The [`BranchCatalog`] trait
//! - [`names`]: Repository/branch name validation
//! - [`memory`]: In-memory [`InMemoryBranchCatalog`]

pub mod error;
pub mod memory;
pub mod names;
pub mod state;
pub mod traits;
pub mod types;

pub use error::{CatalogError, CatalogResult};
pub use memory::InMemoryBranchCatalog;
pub use names::{validate_branch_name, validate_repository_name, validate_storage_namespace};
pub use state::{BranchStagingState, INITIAL_GENERATION};
pub use traits::BranchCatalog;
pub use types::{BranchInfo, RepositoryInfo};
