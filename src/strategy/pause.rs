//! NAV-decay pause
//!
//! New deployments are paused when NAV per share has fallen below all three
//! lookback samples. The pause lasts a fixed number of days and is cleared by
//! the next state-mutating call after it expires.

use ethnum::U256;

use super::config::NavLookbackConfig;
use super::types::PauseState;
use crate::error::Result;
use crate::math::SECONDS_PER_DAY;
use crate::tracking::NavTracker;

/// Pause state for a pause recorded at `last_paused` (0 = never)
pub fn pause_state(last_paused: u64, pause_period_in_days: u16, now: u64) -> PauseState {
    if last_paused == 0 {
        return PauseState::Active;
    }
    let period = u64::from(pause_period_in_days) * SECONDS_PER_DAY;
    if now.saturating_sub(last_paused) <= period {
        PauseState::Paused
    } else {
        PauseState::ExpiredPause
    }
}

/// Latest sample is strictly below every lookback sample.
///
/// Requires more history than the longest lookback, otherwise reports no
/// decay.
pub fn nav_decay_detected(navs: &NavTracker, lookback: &NavLookbackConfig) -> Result<bool> {
    if navs.len() <= lookback.lookback3_in_days as usize {
        return Ok(false);
    }

    let current: U256 = navs.days_ago(0)?;
    for days in [
        lookback.lookback1_in_days,
        lookback.lookback2_in_days,
        lookback.lookback3_in_days,
    ] {
        if current >= navs.days_ago(days as usize)? {
            return Ok(false);
        }
    }
    Ok(true)
}
