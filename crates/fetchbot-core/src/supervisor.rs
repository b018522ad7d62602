//! Job set: spawns download threads, tracks their controllers, prunes
//! finished jobs and broadcasts cancellation.

use crate::config::ThreadOption;
use crate::control::Controller;
use crate::downloader::{self, DownloadHandle};
use crate::report::{report_queue, Report, ReportDrain, ReportSender};
use crate::storage::PlacementLock;
use anyhow::Result;
use std::path::PathBuf;

/// Owns the hand-off queue shared by all of its jobs and the placement lock
/// they finalize under. Performs no I/O itself.
pub struct Supervisor<I> {
    option: ThreadOption,
    lock: PlacementLock,
    tx: ReportSender<I>,
    drain: ReportDrain<I>,
    jobs: Vec<DownloadHandle>,
}

impl<I> Supervisor<I>
where
    I: Clone + Send + 'static,
{
    pub fn new(option: ThreadOption) -> Self {
        Self::with_placement_lock(option, PlacementLock::new())
    }

    /// Use `lock` for the finalize step instead of a private one, e.g. to
    /// share it between supervisors writing to the same directory.
    pub fn with_placement_lock(option: ThreadOption, lock: PlacementLock) -> Self {
        let (tx, drain) = report_queue();
        Self {
            option,
            lock,
            tx,
            drain,
            jobs: Vec::new(),
        }
    }

    pub fn option(&self) -> &ThreadOption {
        &self.option
    }

    pub fn placement_lock(&self) -> &PlacementLock {
        &self.lock
    }

    /// Prune finished jobs, then spawn a worker for `url` -> `path`.
    /// Returns a handle the caller may keep to cancel this job alone.
    pub fn start(&mut self, url: &str, path: impl Into<PathBuf>, info: I) -> Result<Controller> {
        self.cleanup();
        let path = path.into();
        let handle = downloader::download(url, &path, info, self.tx.clone(), &self.option, &self.lock)?;
        let controller = handle.controller.clone();
        self.jobs.push(handle);
        tracing::debug!(url, path = %path.display(), active = self.jobs.len(), "job started");
        Ok(controller)
    }

    /// Drop finished jobs from the set and reap their threads.
    pub fn cleanup(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.jobs)
            .into_iter()
            .partition(|job| job.controller.is_finished());
        self.jobs = running;
        for job in finished {
            if job.thread.join().is_err() {
                tracing::warn!("download thread panicked");
            }
        }
    }

    /// Request cancellation of every unfinished job.
    pub fn cancel_all(&mut self) {
        self.cleanup();
        for job in &self.jobs {
            job.controller.cancel();
        }
        if !self.jobs.is_empty() {
            tracing::info!(count = self.jobs.len(), "cancel requested for running downloads");
        }
    }

    /// Number of jobs not yet known to be finished.
    pub fn active_jobs(&mut self) -> usize {
        self.cleanup();
        self.jobs.len()
    }

    /// Every report queued so far. Returns immediately.
    pub fn drain(&self) -> Vec<Report<I>> {
        self.drain.drain()
    }

    /// At most one queued report. Returns immediately.
    pub fn try_next(&self) -> Option<Report<I>> {
        self.drain.try_next()
    }
}
