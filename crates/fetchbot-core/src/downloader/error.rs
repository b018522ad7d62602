//! Failure causes carried by ERROR reports.

use crate::progress::ProgressReport;
use thiserror::Error;

/// Network or HTTP failure of the streaming GET.
#[derive(Debug, Error)]
pub enum TransferError {
    /// libcurl reported an error (DNS, connection, TLS, reset, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Final response had a non-2xx status.
    #[error("HTTP {code}")]
    Status { code: u32 },
    /// URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Only http and https are fetched.
    #[error("unsupported URL scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },
}

/// Why a job ended without placing a file.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("incomplete download {}B/{}B", .progress.downloaded_size, display_size(.progress.file_size))]
    Incomplete { progress: ProgressReport },

    #[error("server did not declare a size ({}B received)", .progress.downloaded_size)]
    UndeclaredSize { progress: ProgressReport },

    #[error("download cancelled at {}B", .progress.downloaded_size)]
    Cancelled { progress: ProgressReport },

    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<curl::Error> for DownloadError {
    fn from(e: curl::Error) -> Self {
        DownloadError::Transfer(TransferError::Curl(e))
    }
}

fn display_size(size: Option<u64>) -> String {
    size.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
}

impl DownloadError {
    pub(crate) fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        DownloadError::Storage {
            context: context.into(),
            source,
        }
    }

    /// Short stable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::Transfer(_) => "transfer",
            DownloadError::Incomplete { .. } => "incomplete",
            DownloadError::UndeclaredSize { .. } => "undeclared-size",
            DownloadError::Cancelled { .. } => "cancelled",
            DownloadError::Storage { .. } => "storage",
        }
    }

    /// Progress at the time of failure, when the stream had started.
    pub fn progress(&self) -> Option<&ProgressReport> {
        match self {
            DownloadError::Incomplete { progress }
            | DownloadError::UndeclaredSize { progress }
            | DownloadError::Cancelled { progress } => Some(progress),
            DownloadError::Transfer(_) | DownloadError::Storage { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled { .. })
    }
}
