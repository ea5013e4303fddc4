// Migration configuration

use serde::{Deserialize, Serialize};

/// Per-call work bounds for the migration controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Assignment writes one `migrate_batch` call may perform; unbounded if unset
    #[serde(default)]
    pub max_assignments_per_call: Option<usize>,

    /// Token ids one call may name; unbounded if unset
    #[serde(default)]
    pub max_tokens_per_call: Option<usize>,
}

impl MigrationConfig {
    pub fn with_max_assignments_per_call(mut self, max: usize) -> Self {
        self.max_assignments_per_call = Some(max);
        self
    }

    pub fn with_max_tokens_per_call(mut self, max: usize) -> Self {
        self.max_tokens_per_call = Some(max);
        self
    }
}
