//! Engine settings

use serde::{Deserialize, Serialize};

/// Default rank length at which a sibling set is due for rebalancing
pub const DEFAULT_MAX_RANK_LEN: usize = 24;

/// Tunables for the planning engine.
///
/// Every field has a default, so partial configuration files deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Rank length treated as the precision floor for `needs_rebalance`.
    ///
    /// Values below the width a respread itself needs for a sibling set are
    /// raised to that width when checking the set.
    pub max_rank_len: usize,
    /// Offer completion to a parent once all of its subtasks are completed
    pub auto_complete_parents: bool,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_rank_len: DEFAULT_MAX_RANK_LEN,
            auto_complete_parents: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: PlannerSettings =
            serde_json::from_str(r#"{"auto_complete_parents": false}"#).unwrap();
        assert_eq!(settings.max_rank_len, DEFAULT_MAX_RANK_LEN);
        assert!(!settings.auto_complete_parents);
    }
}
