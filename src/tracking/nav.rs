//! NAV Tracker
//!
//! One NAV-per-share sample per day in a ring of [`NAV_HISTORY_CAPACITY`]
//! slots. A sample on the same day as the last one overwrites it; a sample on
//! a later day advances one slot, so gaps between reports do not consume
//! slots and "N days ago" means N recorded days ago.

use ethnum::U256;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::SECONDS_PER_DAY;

/// Enough for a 90 day lookback plus today
pub const NAV_HISTORY_CAPACITY: usize = 91;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavTracker {
    #[serde(with = "crate::serde_utils::u256_seq")]
    history: Vec<U256>,
    current_index: usize,
    len: usize,
    last_timestamp: u64,
}

impl Default for NavTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl NavTracker {
    pub fn new() -> Self {
        Self {
            history: vec![U256::ZERO; NAV_HISTORY_CAPACITY],
            current_index: 0,
            len: 0,
            last_timestamp: 0,
        }
    }

    /// Record `nav_per_share` for the day containing `timestamp`
    pub fn insert(&mut self, nav_per_share: U256, timestamp: u64) -> Result<()> {
        if self.len > 0 && timestamp < self.last_timestamp {
            return Err(Error::InvalidNavTimestamp {
                last: self.last_timestamp,
                attempted: timestamp,
            });
        }

        if self.len == 0 {
            self.current_index = 0;
            self.len = 1;
        } else if timestamp / SECONDS_PER_DAY > self.last_timestamp / SECONDS_PER_DAY {
            self.current_index = (self.current_index + 1) % NAV_HISTORY_CAPACITY;
            self.len = (self.len + 1).min(NAV_HISTORY_CAPACITY);
        }

        self.history[self.current_index] = nav_per_share;
        self.last_timestamp = timestamp;
        Ok(())
    }

    /// Sample recorded `days_ago` days before the latest one
    pub fn days_ago(&self, days_ago: usize) -> Result<U256> {
        if days_ago >= self.len {
            return Err(Error::InvalidDaysAgo {
                days_ago,
                len: self.len,
            });
        }
        let index = (self.current_index + NAV_HISTORY_CAPACITY - days_ago) % NAV_HISTORY_CAPACITY;
        Ok(self.history[index])
    }

    /// Number of recorded days, at most the capacity
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = SECONDS_PER_DAY;

    fn nav(v: u128) -> U256 {
        U256::new(v)
    }

    #[test]
    fn test_same_day_overwrites() {
        let mut tracker = NavTracker::new();
        tracker.insert(nav(100), 10 * DAY).unwrap();
        tracker.insert(nav(105), 10 * DAY + 3_600).unwrap();

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.days_ago(0).unwrap(), nav(105));
    }

    #[test]
    fn test_later_day_advances() {
        let mut tracker = NavTracker::new();
        tracker.insert(nav(100), 10 * DAY).unwrap();
        // A gap of several days still only advances one slot
        tracker.insert(nav(110), 15 * DAY).unwrap();

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.days_ago(0).unwrap(), nav(110));
        assert_eq!(tracker.days_ago(1).unwrap(), nav(100));
    }

    #[test]
    fn test_earlier_timestamp_rejected() {
        let mut tracker = NavTracker::new();
        tracker.insert(nav(100), 10 * DAY + 50).unwrap();
        let err = tracker.insert(nav(90), 10 * DAY + 49).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidNavTimestamp {
                last: 10 * DAY + 50,
                attempted: 10 * DAY + 49,
            }
        );
        // Unchanged
        assert_eq!(tracker.days_ago(0).unwrap(), nav(100));
    }

    #[test]
    fn test_query_beyond_history() {
        let mut tracker = NavTracker::new();
        assert!(tracker.days_ago(0).is_err());
        tracker.insert(nav(1), DAY).unwrap();
        tracker.insert(nav(2), 2 * DAY).unwrap();
        assert_eq!(
            tracker.days_ago(2),
            Err(Error::InvalidDaysAgo { days_ago: 2, len: 2 })
        );
    }

    #[test]
    fn test_wraps_at_capacity() {
        let mut tracker = NavTracker::new();
        for day in 0..200u64 {
            tracker.insert(nav(day as u128), day * DAY).unwrap();
        }
        assert_eq!(tracker.len(), NAV_HISTORY_CAPACITY);
        assert_eq!(tracker.days_ago(0).unwrap(), nav(199));
        assert_eq!(tracker.days_ago(90).unwrap(), nav(109));
        assert!(tracker.days_ago(91).is_err());
    }
}
