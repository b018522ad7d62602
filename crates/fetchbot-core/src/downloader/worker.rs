//! The procedure run on each download thread.
//!
//! PREPARE (stage temp file) -> STREAMING (GET, chunk loop) -> FINALIZE
//! (placement under the shared lock, chmod) -> FINISH report. Any failure
//! becomes a single ERROR report; the controller is marked finished on every
//! exit path.

use super::error::{DownloadError, TransferError};
use crate::config::ThreadOption;
use crate::control::{Controller, FinishGuard};
use crate::http::HeaderCollector;
use crate::progress::{Progress, ProgressReport, ReportTimer};
use crate::report::Reporter;
use crate::storage::{self, PlacementLock};
use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Redirect hops followed before giving up.
const MAX_REDIRECTIONS: u32 = 10;

/// Schemes handed to libcurl.
const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Inputs of one job, moved onto its thread.
pub(crate) struct Job<I> {
    pub(crate) url: String,
    pub(crate) path: PathBuf,
    pub(crate) reporter: Reporter<I>,
    pub(crate) option: ThreadOption,
    pub(crate) controller: Controller,
    pub(crate) lock: PlacementLock,
}

/// Thread entry point. Never panics on download failures; they are reported.
pub(crate) fn run<I: Clone>(mut job: Job<I>) {
    let _finish = FinishGuard {
        controller: job.controller.clone(),
    };
    tracing::info!(url = %job.url, path = %job.path.display(), "download started");
    match execute(&mut job) {
        Ok((saved_path, progress)) => {
            tracing::info!(
                url = %job.url,
                saved = %saved_path.display(),
                bytes = progress.downloaded_size,
                "download finished"
            );
            job.reporter.finish(saved_path, progress);
        }
        Err(error) => {
            if error.is_cancelled() {
                tracing::info!(url = %job.url, "download cancelled");
            } else {
                tracing::warn!(url = %job.url, kind = error.kind(), "download failed: {}", error);
            }
            job.reporter.error(error);
        }
    }
}

fn execute<I: Clone>(job: &mut Job<I>) -> Result<(PathBuf, ProgressReport), DownloadError> {
    let mut temp = storage::stage_temp(&job.path).map_err(|e| {
        DownloadError::storage(format!("failed to stage temp file for {}", job.path.display()), e)
    })?;
    job.reporter.set_temp_path(temp.path());

    let progress = match stream_to(&mut temp, job).and_then(|p| check_complete(p, &job.option)) {
        Ok(p) => p,
        Err(e) => {
            discard(temp);
            return Err(e);
        }
    };
    if let Err(e) = temp.as_file().sync_all() {
        discard(temp);
        return Err(DownloadError::storage("failed to sync temp file", e));
    }

    let saved_path = storage::place(temp, &job.path, &job.lock).map_err(|e| {
        let context = format!("failed to move download into {}", job.path.display());
        discard(e.file);
        DownloadError::storage(context, e.error)
    })?;

    if let Some(permission) = job.option.file_permission {
        storage::set_mode(&saved_path, permission.mode()).map_err(|e| {
            DownloadError::storage(format!("failed to set {} on {}", permission, saved_path.display()), e)
        })?;
    }
    Ok((saved_path, progress.report()))
}

fn check_complete(progress: Progress, option: &ThreadOption) -> Result<Progress, DownloadError> {
    if !progress.is_completed() {
        return Err(DownloadError::Incomplete {
            progress: progress.report(),
        });
    }
    if option.require_content_length && progress.file_size().is_none() {
        return Err(DownloadError::UndeclaredSize {
            progress: progress.report(),
        });
    }
    Ok(progress)
}

fn discard(temp: NamedTempFile) {
    let path = temp.path().to_path_buf();
    if let Err(e) = temp.close() {
        tracing::warn!(path = %path.display(), "failed to remove temp file: {}", e);
    }
}

/// Why the write callback stopped the transfer.
enum Abort {
    Cancelled,
    Status(u32),
    Storage(std::io::Error),
}

/// State shared by the header and write callbacks of one transfer.
struct Stream<'a, I> {
    file: &'a mut File,
    reporter: &'a Reporter<I>,
    controller: &'a Controller,
    option: &'a ThreadOption,
    headers: HeaderCollector,
    progress: Option<Progress>,
    timer: ReportTimer,
    abort: Option<Abort>,
}

impl<I: Clone> Stream<'_, I> {
    /// First body bytes: the final response's headers are complete.
    fn begin(&mut self) -> Result<(), Abort> {
        let status = self.headers.status();
        if let Some(code) = status.filter(|c| !(200..300).contains(c)) {
            return Err(Abort::Status(code));
        }
        let progress = self.start_progress();
        self.progress = Some(progress);
        self.timer = ReportTimer::new(self.option.report_interval());
        Ok(())
    }

    /// Size hint from the final headers, then the START report.
    fn start_progress(&self) -> Progress {
        let progress = Progress::new(self.headers.content_length(), self.option.speedmeter_size);
        self.reporter.start(self.headers.meta(0), progress.report());
        progress
    }

    /// Returns the number of bytes accepted; anything short of `data.len()`
    /// makes libcurl abort the transfer.
    fn on_data(&mut self, data: &[u8]) -> usize {
        if self.abort.is_some() {
            return 0;
        }
        if self.progress.is_none() {
            if let Err(abort) = self.begin() {
                self.abort = Some(abort);
                return 0;
            }
        }
        for piece in data.chunks(self.option.chunk_size.max(1)) {
            if let Err(e) = self.file.write_all(piece) {
                self.abort = Some(Abort::Storage(e));
                return 0;
            }
            let Some(progress) = self.progress.as_mut() else {
                return 0;
            };
            progress.update(piece.len() as u64);
            if self.timer.check() {
                self.reporter.progress(progress.report());
            }
            if self.controller.is_canceled() {
                self.abort = Some(Abort::Cancelled);
                return 0;
            }
        }
        data.len()
    }

    fn snapshot(&self) -> ProgressReport {
        self.progress
            .as_ref()
            .map(Progress::report)
            .unwrap_or_default()
    }
}

/// Reject anything libcurl could read that is not HTTP(S), e.g. `file://`.
fn check_scheme(url: &str) -> Result<(), TransferError> {
    let parsed = url::Url::parse(url)?;
    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(TransferError::UnsupportedScheme {
            scheme: parsed.scheme().to_string(),
        });
    }
    Ok(())
}

/// Stream the body of `job.url` into `temp`, emitting START and PROGRESS.
fn stream_to<I: Clone>(temp: &mut NamedTempFile, job: &Job<I>) -> Result<Progress, DownloadError> {
    check_scheme(&job.url)?;
    let mut easy = curl::easy::Easy::new();
    easy.url(&job.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(MAX_REDIRECTIONS)?;

    let stream = RefCell::new(Stream {
        file: temp.as_file_mut(),
        reporter: &job.reporter,
        controller: &job.controller,
        option: &job.option,
        headers: HeaderCollector::new(&job.url),
        progress: None,
        timer: ReportTimer::new(job.option.report_interval()),
        abort: None,
    });

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            stream.borrow_mut().headers.push_line(line);
            true
        })?;
        transfer.write_function(|data| Ok(stream.borrow_mut().on_data(data)))?;
        transfer.perform()
    };

    let mut stream = stream.into_inner();
    match stream.abort.take() {
        Some(Abort::Cancelled) => {
            return Err(DownloadError::Cancelled {
                progress: stream.snapshot(),
            })
        }
        Some(Abort::Status(code)) => return Err(TransferError::Status { code }.into()),
        Some(Abort::Storage(e)) => return Err(DownloadError::storage("failed to write temp file", e)),
        None => {}
    }

    // A non-2xx response with an empty body never reached the write callback.
    let code = easy.response_code().unwrap_or(0);
    if code != 0 && !(200..300).contains(&code) {
        return Err(TransferError::Status { code }.into());
    }

    if let Err(e) = performed {
        if e.is_partial_file() {
            return Err(DownloadError::Incomplete {
                progress: stream.snapshot(),
            });
        }
        return Err(e.into());
    }

    let progress = match stream.progress.take() {
        Some(progress) => progress,
        // empty body: the write callback never ran
        None => stream.start_progress(),
    };
    Ok(progress)
}
