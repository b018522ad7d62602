//! Turns worker state transitions into [`Report`]s on the hand-off queue.

use super::{Report, ReportKind, ReportSender};
use crate::downloader::DownloadError;
use crate::http::ResponseMeta;
use crate::progress::ProgressReport;
use std::path::{Path, PathBuf};

/// Binds one job's identity to the shared queue. Used from the worker thread only.
pub struct Reporter<I> {
    tx: ReportSender<I>,
    info: I,
    url: String,
    requested_path: PathBuf,
    temp_path: Option<PathBuf>,
}

impl<I: Clone> Reporter<I> {
    pub fn new(tx: ReportSender<I>, info: I, url: &str, requested_path: &Path) -> Self {
        Self {
            tx,
            info,
            url: url.to_string(),
            requested_path: requested_path.to_path_buf(),
            temp_path: None,
        }
    }

    /// Remember the staging file; later reports carry it.
    pub fn set_temp_path(&mut self, temp_path: &Path) {
        self.temp_path = Some(temp_path.to_path_buf());
    }

    pub fn start(&self, response: ResponseMeta, progress: ProgressReport) {
        self.send(ReportKind::Start { response, progress });
    }

    pub fn progress(&self, progress: ProgressReport) {
        self.send(ReportKind::Progress { progress });
    }

    pub fn finish(&self, saved_path: PathBuf, progress: ProgressReport) {
        self.send(ReportKind::Finish {
            saved_path,
            progress,
        });
    }

    pub fn error(&self, error: DownloadError) {
        self.send(ReportKind::Error { error });
    }

    fn send(&self, kind: ReportKind) {
        let tag = kind.tag();
        let report = Report {
            info: self.info.clone(),
            url: self.url.clone(),
            requested_path: self.requested_path.clone(),
            temp_path: self.temp_path.clone(),
            kind,
        };
        if self.tx.send(report).is_err() {
            tracing::debug!(url = %self.url, %tag, "report queue closed, report dropped");
        }
    }
}
