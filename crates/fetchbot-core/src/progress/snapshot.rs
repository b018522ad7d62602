//! Immutable progress snapshot handed out in reports.

/// Point-in-time view of a job's progress.
///
/// Derived metrics return `None` whenever their inputs are undefined
/// (unknown file size, zero elapsed time, non-positive speed).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressReport {
    /// Declared size in bytes, if the server sent one.
    pub file_size: Option<u64>,
    /// Bytes received so far.
    pub downloaded_size: u64,
    /// Seconds between stream start and the latest received chunk.
    pub elapsed_secs: f64,
    /// Windowed instantaneous speed in bytes per second.
    pub speed: Option<f64>,
}

impl ProgressReport {
    /// Bytes still expected. Negative when the server sent more than it declared.
    pub fn remaining_size(&self) -> Option<i64> {
        let total = self.file_size?;
        Some(total as i64 - self.downloaded_size as i64)
    }

    /// Fraction received, `downloaded / file_size`. Not clamped.
    pub fn progress_rate(&self) -> Option<f64> {
        match self.file_size {
            Some(total) if total > 0 => Some(self.downloaded_size as f64 / total as f64),
            _ => None,
        }
    }

    /// Bytes per second over the whole transfer.
    pub fn average_speed(&self) -> Option<f64> {
        if self.elapsed_secs <= 0.0 {
            return None;
        }
        Some(self.downloaded_size as f64 / self.elapsed_secs)
    }

    /// Seconds left at the current windowed speed.
    pub fn remaining_secs(&self) -> Option<f64> {
        let remaining = self.remaining_size()?;
        let speed = self.speed?;
        if remaining < 0 || speed <= 0.0 {
            return None;
        }
        Some(remaining as f64 / speed)
    }
}
