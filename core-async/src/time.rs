//! Time-related abstractions.
//!
//! The tick notifier is an [`Interval`] armed with [`interval_at`] so the first
//! tick lands one period after playback starts, never immediately.

pub use tokio::time::{
    interval, interval_at, sleep, sleep_until, timeout, Interval, MissedTickBehavior, Sleep,
};

pub use std::time::Duration;
pub use tokio::time::Instant;

/// Builds the periodic tick interval for a playback period.
///
/// Missed ticks are delayed rather than bursted: a stalled driver catches up
/// with one tick, not a flood of stale positions.
pub fn tick_interval(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
