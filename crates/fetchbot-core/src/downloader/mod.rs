//! Threaded single-stream downloader.
//!
//! [`download`] spawns one OS thread per job. The thread streams the body of
//! an HTTP GET into a temp file beside the destination, publishes
//! [`Report`](crate::report::Report)s on the hand-off queue, and moves the
//! finished file into place under a [`PlacementLock`]. Cancellation is
//! cooperative through the returned [`Controller`].

mod error;
mod worker;

pub use error::{DownloadError, TransferError};

use crate::config::ThreadOption;
use crate::control::Controller;
use crate::report::{ReportSender, Reporter};
use crate::storage::PlacementLock;
use anyhow::{Context, Result};
use std::path::Path;
use std::thread::JoinHandle;

/// Handles of a spawned job.
#[derive(Debug)]
pub struct DownloadHandle {
    pub controller: Controller,
    pub thread: JoinHandle<()>,
}

/// Start downloading `url` to `path` on a new thread.
///
/// `info` is copied into every report of the job. Fails only if `option` is
/// invalid or the thread cannot be spawned; download failures arrive as
/// ERROR reports.
pub fn download<I>(
    url: &str,
    path: &Path,
    info: I,
    queue: ReportSender<I>,
    option: &ThreadOption,
    lock: &PlacementLock,
) -> Result<DownloadHandle>
where
    I: Clone + Send + 'static,
{
    option.validate().context("invalid download options")?;
    let controller = Controller::new();
    let job = worker::Job {
        url: url.to_string(),
        path: path.to_path_buf(),
        reporter: Reporter::new(queue, info, url, path),
        option: option.clone(),
        controller: controller.clone(),
        lock: lock.clone(),
    };
    let name = path
        .file_name()
        .map(|n| format!("download:{}", n.to_string_lossy()))
        .unwrap_or_else(|| "download".to_string());
    let thread = std::thread::Builder::new()
        .name(name)
        .spawn(move || worker::run(job))
        .with_context(|| format!("failed to spawn download thread for {}", url))?;
    Ok(DownloadHandle { controller, thread })
}
