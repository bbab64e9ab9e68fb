//! Delta histories for trend lookups.

use crate::ring::RingBuffer;
use crate::{Temperature, TREND_WINDOW};

/// Slot read as the "one window old" value after each insert.
///
/// This is an absolute index, not an offset from the write cursor, so it only
/// holds the value from `TREND_WINDOW` cycles ago when the cursor happens to
/// line up with it. Use [`TrendTracker::lagged_sample_delta`] and
/// [`TrendTracker::lagged_target_delta`] for cursor-relative lookups.
pub const WINDOW_OLD_SLOT: usize = TREND_WINDOW - 1;

/// Deltas produced by one [`TrendTracker::record`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Trend {
    /// `average - previous average`
    pub sample_delta: f32,
    /// `target - average`; positive means too cold
    pub target_delta: f32,
    pub window_old_sample_delta: f32,
    pub window_old_target_delta: f32,
}

#[derive(Debug, Clone, Default)]
pub struct TrendTracker {
    previous_average: Temperature,
    sample_deltas: RingBuffer<f32, TREND_WINDOW>,
    target_deltas: RingBuffer<f32, TREND_WINDOW>,
}

impl TrendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the deltas for a fresh average.
    ///
    /// The previous average starts at `0.0`, so the first sample delta equals the
    /// first average.
    pub fn record(&mut self, average: Temperature, target: Temperature) -> Trend {
        let sample_delta = average - self.previous_average;
        self.previous_average = average;
        self.sample_deltas.insert(sample_delta);

        let target_delta = target - average;
        self.target_deltas.insert(target_delta);

        let trend = Trend {
            sample_delta,
            target_delta,
            window_old_sample_delta: self.sample_deltas.at(WINDOW_OLD_SLOT),
            window_old_target_delta: self.target_deltas.at(WINDOW_OLD_SLOT),
        };
        trace!(
            "trend: sample {} target {}",
            trend.sample_delta,
            trend.target_delta
        );
        trend
    }

    /// Sample delta recorded `lag` calls ago (`1` is the latest).
    pub fn lagged_sample_delta(&self, lag: usize) -> f32 {
        self.sample_deltas.lagged(lag)
    }

    /// Target delta recorded `lag` calls ago (`1` is the latest).
    pub fn lagged_target_delta(&self, lag: usize) -> f32 {
        self.target_deltas.lagged(lag)
    }

    pub fn sample_deltas(&self) -> &RingBuffer<f32, TREND_WINDOW> {
        &self.sample_deltas
    }

    pub fn target_deltas(&self) -> &RingBuffer<f32, TREND_WINDOW> {
        &self.target_deltas
    }
}
