//! Violation Tracker
//!
//! Rolling record of the last [`VIOLATION_WINDOW`] rebalance outcomes. A
//! violation is a rebalance that pulled funds out of a destination sooner than
//! the swap-cost offset period after they were added. The running count is
//! maintained on insert, never by rescanning the buffer.

use serde::{Deserialize, Serialize};

/// Number of outcomes kept
pub const VIOLATION_WINDOW: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationTracker {
    outcomes: [bool; VIOLATION_WINDOW],
    head: usize,
    len: usize,
    violation_count: usize,
}

impl ViolationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one rebalance outcome, evicting the oldest once full
    pub fn insert(&mut self, is_violation: bool) {
        if self.len == VIOLATION_WINDOW {
            if self.outcomes[self.head] {
                self.violation_count -= 1;
            }
        } else {
            self.len += 1;
        }

        self.outcomes[self.head] = is_violation;
        if is_violation {
            self.violation_count += 1;
        }
        self.head = (self.head + 1) % VIOLATION_WINDOW;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == VIOLATION_WINDOW
    }

    pub fn violation_count(&self) -> usize {
        self.violation_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_violations_before_full() {
        let mut tracker = ViolationTracker::new();
        for outcome in [true, false, true, true] {
            tracker.insert(outcome);
        }
        assert_eq!(tracker.len(), 4);
        assert_eq!(tracker.violation_count(), 3);
        assert!(!tracker.is_full());
    }

    #[test]
    fn test_eleventh_insert_drops_oldest() {
        let mut tracker = ViolationTracker::new();
        tracker.insert(true);
        for _ in 0..9 {
            tracker.insert(false);
        }
        assert!(tracker.is_full());
        assert_eq!(tracker.violation_count(), 1);

        // Oldest (a violation) is evicted
        tracker.insert(false);
        assert_eq!(tracker.len(), VIOLATION_WINDOW);
        assert_eq!(tracker.violation_count(), 0);

        tracker.insert(true);
        assert_eq!(tracker.violation_count(), 1);
    }

    #[test]
    fn test_count_matches_window_over_long_run() {
        let mut tracker = ViolationTracker::new();
        let outcomes: Vec<bool> = (0..37).map(|i| i % 3 == 0 || i % 7 == 0).collect();
        for (i, outcome) in outcomes.iter().enumerate() {
            tracker.insert(*outcome);
            let start = (i + 1).saturating_sub(VIOLATION_WINDOW);
            let expected = outcomes[start..=i].iter().filter(|v| **v).count();
            assert_eq!(tracker.violation_count(), expected);
        }
    }

    #[test]
    fn test_reset() {
        let mut tracker = ViolationTracker::new();
        for _ in 0..12 {
            tracker.insert(true);
        }
        tracker.reset();
        assert!(tracker.is_empty());
        assert_eq!(tracker.violation_count(), 0);
        assert_eq!(tracker, ViolationTracker::default());
    }
}
