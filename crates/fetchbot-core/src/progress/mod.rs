//! Per-job progress accounting (bytes received, elapsed time, speed).
//!
//! [`Progress`] is the mutable accumulator owned by the worker thread;
//! [`ProgressReport`] is the immutable snapshot placed in reports.

mod meter;
mod snapshot;

pub use meter::SpeedMeter;
pub use snapshot::ProgressReport;

use std::time::{Duration, Instant};

/// Mutable progress for one job.
#[derive(Debug, Clone)]
pub struct Progress {
    file_size: Option<u64>,
    downloaded_size: u64,
    start_time: Instant,
    latest_time: Instant,
    meter: SpeedMeter,
}

impl Progress {
    /// Start accounting now. The meter is seeded with a zero sample so the
    /// first `update` already yields a speed.
    pub fn new(file_size: Option<u64>, speedmeter_size: usize) -> Self {
        let now = Instant::now();
        let mut meter = SpeedMeter::new(speedmeter_size);
        meter.push_at(0, now);
        Self {
            file_size,
            downloaded_size: 0,
            start_time: now,
            latest_time: now,
            meter,
        }
    }

    /// Account for `received_size` more bytes.
    pub fn update(&mut self, received_size: u64) {
        self.downloaded_size += received_size;
        self.latest_time = Instant::now();
        self.meter.push_at(self.downloaded_size, self.latest_time);
    }

    /// True when the declared size was reached, or when no size was declared.
    ///
    /// Without a declared size a truncated stream cannot be told apart from a
    /// complete one; see `ThreadOption::require_content_length`.
    pub fn is_completed(&self) -> bool {
        match self.file_size {
            None => true,
            Some(size) => size == self.downloaded_size,
        }
    }

    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    pub fn downloaded_size(&self) -> u64 {
        self.downloaded_size
    }

    pub fn report(&self) -> ProgressReport {
        ProgressReport {
            file_size: self.file_size,
            downloaded_size: self.downloaded_size,
            elapsed_secs: self.latest_time.duration_since(self.start_time).as_secs_f64(),
            speed: self.meter.speed(),
        }
    }
}

/// Paces PROGRESS reports: `check` is true at most once per interval.
#[derive(Debug, Clone)]
pub struct ReportTimer {
    last: Instant,
    interval: Duration,
}

impl ReportTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            last: Instant::now(),
            interval,
        }
    }

    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last) >= self.interval {
            self.last = now;
            return true;
        }
        false
    }
}
