//! # Metrics
//!
//! Per-handler execution metrics and the dispatcher-wide error table.

use std::time::Duration;

use serde::Serialize;

use super::errors::TransactionError;

/// Executions and cumulative wall time, for one handler or summed over all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransactionMetrics {
    pub executions: u64,
    pub total_time: Duration,
}

impl TransactionMetrics {
    pub(crate) fn record(&mut self, elapsed: Duration) {
        self.executions += 1;
        self.total_time += elapsed;
    }

    pub fn average_time(&self) -> Duration {
        match u32::try_from(self.executions) {
            Ok(0) => Duration::ZERO,
            Ok(count) => self.total_time / count,
            Err(_) => Duration::from_secs_f64(
                self.total_time.as_secs_f64() / self.executions as f64,
            ),
        }
    }
}

impl std::ops::Add for TransactionMetrics {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            executions: self.executions + other.executions,
            total_time: self.total_time + other.total_time,
        }
    }
}

/// Number of slots in the error table: one per kind plus the total.
pub const ERROR_SLOTS: usize = TransactionError::ALL.len() + 1;

/// Monotonic error counters. Every recorded error bumps its kind and the
/// total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    counters: [u64; ERROR_SLOTS],
}

impl ErrorCounts {
    pub(crate) fn record(&mut self, kind: TransactionError) {
        self.counters[kind.index()] += 1;
        self.counters[ERROR_SLOTS - 1] += 1;
    }

    pub fn get(&self, kind: TransactionError) -> u64 {
        self.counters[kind.index()]
    }

    pub fn total(&self) -> u64 {
        self.counters[ERROR_SLOTS - 1]
    }

    /// `(kind, count)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (TransactionError, u64)> + '_ {
        TransactionError::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}
