//! Types for the organize module.

use serde::{Deserialize, Serialize};

/// Outcome of one group's copy work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOutcome {
    /// Group key, `model/YYYYMMDD`
    pub group: String,
    pub copied: usize,
    pub failed: usize,
}

/// Result of the copy phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyResult {
    pub files_copied: usize,
    pub failures: usize,
    pub bytes_copied: u64,
    pub folders_created: usize,
    /// Groups whose every copy task has finished, in completion order
    pub groups: Vec<GroupOutcome>,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

impl CopyResult {
    /// True when no copy failed
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}
