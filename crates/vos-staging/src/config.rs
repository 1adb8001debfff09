use serde::{Deserialize, Serialize};

/// Tuning knobs for the staging subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Number of lock shards per branch staging area. Links to paths in
    /// different shards never touch the same lock.
    pub path_shards: usize,
    /// Path segment between the storage namespace and allocated objects.
    pub data_prefix: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            path_shards: 64,
            data_prefix: "data".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = StagingConfig::default();
        assert_eq!(c.path_shards, 64);
        assert_eq!(c.data_prefix, "data");
    }
}
