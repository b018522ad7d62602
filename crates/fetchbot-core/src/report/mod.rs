//! Lifecycle events of download jobs and the queue they travel through.
//!
//! Each job produces `Start`, zero or more `Progress`, then exactly one of
//! `Finish` or `Error`, in that order. Reports of different jobs sharing a
//! queue interleave in no particular order.

mod reporter;

pub use reporter::Reporter;

use crate::downloader::DownloadError;
use crate::http::ResponseMeta;
use crate::progress::ProgressReport;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// One event in a job's lifecycle. `I` is caller-defined correlation data,
/// passed through unchanged.
#[derive(Debug)]
pub struct Report<I> {
    pub info: I,
    /// URL as requested by the caller.
    pub url: String,
    /// Destination requested by the caller.
    pub requested_path: PathBuf,
    /// Staging file, once it has been created.
    pub temp_path: Option<PathBuf>,
    pub kind: ReportKind,
}

/// Variant-specific payload of a [`Report`].
#[derive(Debug)]
pub enum ReportKind {
    Start {
        response: ResponseMeta,
        progress: ProgressReport,
    },
    Progress {
        progress: ProgressReport,
    },
    Finish {
        /// Where the file ended up; differs from `requested_path` after a name collision.
        saved_path: PathBuf,
        progress: ProgressReport,
    },
    Error {
        error: DownloadError,
    },
}

/// Fieldless view of [`ReportKind`], handy for logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportTag {
    Start,
    Progress,
    Finish,
    Error,
}

impl std::fmt::Display for ReportTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReportTag::Start => "start",
            ReportTag::Progress => "progress",
            ReportTag::Finish => "finish",
            ReportTag::Error => "error",
        };
        f.write_str(s)
    }
}

impl ReportKind {
    pub fn tag(&self) -> ReportTag {
        match self {
            ReportKind::Start { .. } => ReportTag::Start,
            ReportKind::Progress { .. } => ReportTag::Progress,
            ReportKind::Finish { .. } => ReportTag::Finish,
            ReportKind::Error { .. } => ReportTag::Error,
        }
    }

    /// Progress snapshot, for the variants that carry one.
    pub fn progress(&self) -> Option<&ProgressReport> {
        match self {
            ReportKind::Start { progress, .. }
            | ReportKind::Progress { progress }
            | ReportKind::Finish { progress, .. } => Some(progress),
            ReportKind::Error { .. } => None,
        }
    }
}

impl<I> Report<I> {
    pub fn tag(&self) -> ReportTag {
        self.kind.tag()
    }

    /// `Finish` and `Error` end a job's report stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ReportKind::Finish { .. } | ReportKind::Error { .. })
    }

    /// Final path of a finished job.
    pub fn saved_path(&self) -> Option<&Path> {
        match &self.kind {
            ReportKind::Finish { saved_path, .. } => Some(saved_path),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&DownloadError> {
        match &self.kind {
            ReportKind::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// Producer half of the hand-off queue, cloned into every worker.
pub type ReportSender<I> = Sender<Report<I>>;

/// Consumer half of the hand-off queue. Never blocks.
#[derive(Debug)]
pub struct ReportDrain<I> {
    rx: Receiver<Report<I>>,
}

/// Create a hand-off queue.
pub fn report_queue<I>() -> (ReportSender<I>, ReportDrain<I>) {
    let (tx, rx) = mpsc::channel();
    (tx, ReportDrain { rx })
}

impl<I> ReportDrain<I> {
    /// Next queued report, if any.
    pub fn try_next(&self) -> Option<Report<I>> {
        match self.rx.try_recv() {
            Ok(report) => Some(report),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Everything queued right now; empty when nothing is pending.
    pub fn drain(&self) -> Vec<Report<I>> {
        self.rx.try_iter().collect()
    }
}
