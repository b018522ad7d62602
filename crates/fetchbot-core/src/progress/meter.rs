//! Sliding-window throughput estimator.

use std::collections::VecDeque;
use std::time::Instant;

/// One sample: cumulative value observed at `time`.
#[derive(Debug, Clone, Copy)]
struct Sample {
    value: u64,
    time: Instant,
}

/// Bounded window of (cumulative value, timestamp) samples. The oldest sample
/// is evicted once the window holds `size` entries.
///
/// Single writer only; the worker thread owns it through [`super::Progress`].
#[derive(Debug, Clone)]
pub struct SpeedMeter {
    samples: VecDeque<Sample>,
    size: usize,
}

impl SpeedMeter {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            samples: VecDeque::with_capacity(size),
            size,
        }
    }

    /// Record `value` at the current instant.
    pub fn push(&mut self, value: u64) {
        self.push_at(value, Instant::now());
    }

    pub(crate) fn push_at(&mut self, value: u64, time: Instant) {
        if self.samples.len() == self.size {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { value, time });
    }

    /// Units per second between the oldest and newest sample.
    ///
    /// `None` until two samples with distinct timestamps are in the window.
    pub fn speed(&self) -> Option<f64> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let span = last.time.checked_duration_since(first.time)?.as_secs_f64();
        if span <= 0.0 {
            return None;
        }
        Some((last.value as f64 - first.value as f64) / span)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
