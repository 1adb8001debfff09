use serde::{Deserialize, Serialize};

use crate::token::StagingToken;

/// A writable physical location handed to a client, fenced by a token.
///
/// Created by the allocator, immutable, and consumed by the first successful
/// link. Abandoned locations are left for garbage collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingLocation {
    /// Where the client must write the object bytes.
    pub physical_address: String,
    /// Fence proving the location was issued under a given branch generation.
    pub token: StagingToken,
}

impl StagingLocation {
    pub fn new(physical_address: impl Into<String>, token: StagingToken) -> Self {
        Self {
            physical_address: physical_address.into(),
            token,
        }
    }
}
