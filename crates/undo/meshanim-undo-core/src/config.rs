//! History limits.

use serde::{Deserialize, Serialize};

/// Bounds applied to the undo stack after every committed operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoConfig {
    /// Maximum number of undo lists kept; 0 disables the limit.
    pub max_levels: usize,
    /// Approximate byte budget for all undo lists; 0 disables the limit.
    /// The most recent list is always kept even when it alone exceeds the budget.
    pub max_size_bytes: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_levels: 200,
            max_size_bytes: 0,
        }
    }
}
