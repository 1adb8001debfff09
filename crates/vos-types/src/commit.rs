use serde::{Deserialize, Serialize};

use crate::stats::ObjectStats;

/// What a commit took out of a branch's staging area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub repository: String,
    pub branch: String,
    /// The staging generation in effect after the commit.
    pub generation: u64,
    /// Staged objects sealed by the commit, sorted by path.
    pub objects: Vec<ObjectStats>,
}

impl CommitSummary {
    /// Number of objects sealed by the commit.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if nothing was staged.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
