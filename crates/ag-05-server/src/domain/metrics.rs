//! # Server Metrics
//!
//! Cumulative transaction counters plus a per-second running average over
//! the last [`TRACKING_WINDOW`] seconds, shifted by the manager thread.

use std::time::Duration;

use serde::Serialize;

/// Seconds covered by the running average.
pub const TRACKING_WINDOW: usize = 30;

/// Count and cumulative time of one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metric {
    pub count: u64,
    pub timing: Duration,
}

impl Metric {
    fn record(&mut self, timing: Duration) {
        self.count += 1;
        self.timing += timing;
    }

    /// Average seconds per recorded event.
    pub fn average_secs(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.timing.as_secs_f64() / self.count as f64
        }
    }
}

/// Cumulative server metrics. Every transaction counts toward both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ServerMetrics {
    pub total: Metric,
    pub transaction: Metric,
}

impl ServerMetrics {
    pub(crate) fn record_transaction(&mut self, timing: Duration) {
        self.total.record(timing);
        self.transaction.record(timing);
    }
}

/// Sliding window of per-second transaction counts and timings.
#[derive(Debug, Clone)]
pub struct TrackingWindow {
    counts: [f64; TRACKING_WINDOW],
    timings: [f64; TRACKING_WINDOW],
    filled: usize,
    pending_count: f64,
    pending_timing: f64,
    count_average: f64,
    timing_average: f64,
}

impl Default for TrackingWindow {
    fn default() -> Self {
        Self {
            counts: [0.0; TRACKING_WINDOW],
            timings: [0.0; TRACKING_WINDOW],
            filled: 0,
            pending_count: 0.0,
            pending_timing: 0.0,
            count_average: 0.0,
            timing_average: 0.0,
        }
    }
}

impl TrackingWindow {
    /// Add one transaction to the current second.
    pub(crate) fn record(&mut self, timing: Duration) {
        self.pending_count += 1.0;
        self.pending_timing += timing.as_secs_f64();
    }

    /// Close the current second: push it onto the window and recompute the
    /// averages over the filled slots.
    pub(crate) fn shift(&mut self) {
        self.filled = (self.filled + 1).min(TRACKING_WINDOW);
        self.counts.copy_within(0..TRACKING_WINDOW - 1, 1);
        self.timings.copy_within(0..TRACKING_WINDOW - 1, 1);
        self.counts[0] = self.pending_count;
        self.timings[0] = self.pending_timing;
        self.pending_count = 0.0;
        self.pending_timing = 0.0;

        let slots = self.filled as f64;
        self.count_average = self.counts[..self.filled].iter().sum::<f64>() / slots;
        let timing_per_second = self.timings[..self.filled].iter().sum::<f64>() / slots;
        self.timing_average = if self.count_average > 0.0 {
            timing_per_second / self.count_average
        } else {
            0.0
        };
    }

    /// Average transactions per second over the window.
    pub fn count_average(&self) -> f64 {
        self.count_average
    }

    /// Average seconds per transaction over the window.
    pub fn timing_average(&self) -> f64 {
        self.timing_average
    }

    /// Seconds of history currently held.
    pub fn filled(&self) -> usize {
        self.filled
    }
}
