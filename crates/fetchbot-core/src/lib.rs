//! fetchbot core: a threaded, cancellable, progress-reporting download engine.
//!
//! A [`Supervisor`] starts one worker thread per download. Workers publish
//! [`Report`]s (start, progress, finish, error) on a queue the caller drains
//! on its own schedule without blocking.

pub mod config;
pub mod logging;

pub mod control;
pub mod downloader;
pub mod http;
pub mod naming;
pub mod notice;
pub mod progress;
pub mod report;
pub mod storage;
pub mod supervisor;

pub use config::{FetchbotConfig, FilePermission, ThreadOption};
pub use control::Controller;
pub use downloader::{download, DownloadError, DownloadHandle, TransferError};
pub use http::ResponseMeta;
pub use progress::{Progress, ProgressReport, SpeedMeter};
pub use report::{report_queue, Report, ReportDrain, ReportKind, ReportSender, ReportTag, Reporter};
pub use storage::PlacementLock;
pub use supervisor::Supervisor;
