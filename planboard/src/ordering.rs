//! Sibling ordering.
//!
//! `PositionIndex` hands out ranks for inserted or moved items without
//! renumbering their siblings. Ranks only grow longer as the same gap is split
//! again and again; once a sibling set hits the configured length ceiling it
//! reports `needs_rebalance` and the caller can respread it in one pass.

use crate::error::Result;
use crate::settings::{PlannerSettings, DEFAULT_MAX_RANK_LEN};
use crate::types::Ordinal;
use tracing::debug;

/// Computes ranks for sibling sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionIndex {
    max_rank_len: usize,
}

impl Default for PositionIndex {
    fn default() -> Self {
        Self {
            max_rank_len: DEFAULT_MAX_RANK_LEN,
        }
    }
}

impl PositionIndex {
    pub fn new(max_rank_len: usize) -> Self {
        Self {
            max_rank_len: max_rank_len.max(2),
        }
    }

    pub fn from_settings(settings: &PlannerSettings) -> Self {
        Self::new(settings.max_rank_len)
    }

    pub fn max_rank_len(&self) -> usize {
        self.max_rank_len
    }

    /// Rank strictly between two neighbours; a missing bound is open-ended.
    ///
    /// Fails with `InvalidOrdering` when `before >= after`; callers should
    /// re-read the current neighbours before retrying.
    pub fn position_between(
        &self,
        before: Option<&Ordinal>,
        after: Option<&Ordinal>,
    ) -> Result<Ordinal> {
        match (before, after) {
            (None, None) => Ok(Ordinal::first()),
            (Some(before), None) => Ok(Ordinal::after(before)),
            (None, Some(after)) => Ok(Ordinal::before(after)),
            (Some(before), Some(after)) => Ordinal::between(before, after),
        }
    }

    /// Whether a sibling sequence (in display order) should be respread.
    ///
    /// True when the ranks are not strictly increasing, which happens after
    /// conflicting concurrent writes, or when any rank has reached the length
    /// ceiling. The ceiling never drops below what `rebalance` itself produces
    /// for the sequence, so a freshly respread set is never flagged.
    pub fn needs_rebalance<'a, I>(&self, sequence: I) -> bool
    where
        I: IntoIterator<Item = &'a Ordinal>,
    {
        let ranks: Vec<&Ordinal> = sequence.into_iter().collect();
        let ceiling = self
            .max_rank_len
            .max(Ordinal::spread_len(ranks.len()) + 1);
        ranks.iter().any(|rank| rank.len() >= ceiling)
            || ranks.windows(2).any(|w| w[0] >= w[1])
    }

    /// Evenly spaced ranks for a whole sibling set, in the given order.
    ///
    /// The only O(n) operation here; run it off the interactive path.
    pub fn rebalance(&self, sequence: &[Ordinal]) -> Vec<Ordinal> {
        debug!(count = sequence.len(), "rebalancing sibling ranks");
        Ordinal::spread(sequence.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanError;

    fn ord(s: &str) -> Ordinal {
        Ordinal::parse(s).unwrap()
    }

    #[test]
    fn test_open_bounds() {
        let index = PositionIndex::default();
        let only = index.position_between(None, None).unwrap();
        let after = index.position_between(Some(&only), None).unwrap();
        let before = index.position_between(None, Some(&only)).unwrap();
        assert!(before < only && only < after);
    }

    #[test]
    fn test_contradictory_neighbours() {
        let index = PositionIndex::default();
        let result = index.position_between(Some(&ord("b")), Some(&ord("a")));
        assert!(matches!(result, Err(PlanError::InvalidOrdering { .. })));
    }

    #[test]
    fn test_needs_rebalance_on_duplicates() {
        let index = PositionIndex::default();
        let ranks = [ord("a"), ord("a"), ord("b")];
        assert!(index.needs_rebalance(&ranks));
        let ranks = [ord("a"), ord("b")];
        assert!(!index.needs_rebalance(&ranks));
    }

    #[test]
    fn test_needs_rebalance_at_precision_floor() {
        let index = PositionIndex::new(4);
        let low = ord("1");
        let mut high = ord("2");
        let mut inserted = 0;
        while !index.needs_rebalance([&low, &high]) {
            high = index.position_between(Some(&low), Some(&high)).unwrap();
            inserted += 1;
        }
        assert!(inserted > 0);
        assert!(high.len() >= 4);
    }

    #[test]
    fn test_low_ceiling_does_not_flag_respread_ranks() {
        let index = PositionIndex::new(2);
        for count in [2, 5, 80] {
            let respread = index.rebalance(&vec![Ordinal::first(); count]);
            assert!(!index.needs_rebalance(&respread));
        }
    }

    #[test]
    fn test_rebalance_preserves_count_and_spacing() {
        let index = PositionIndex::default();
        let ranks = vec![ord("a"), ord("a"), ord("aV"), ord("z1")];
        let respread = index.rebalance(&ranks);
        assert_eq!(respread.len(), 4);
        assert!(respread.windows(2).all(|w| w[0] < w[1]));
        assert!(!index.needs_rebalance(&respread));
    }
}
