//! Tracing subscriber setup: a log file under the XDG state dir, or stderr.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,fetchbot=debug,fetchbot_core=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Path of the log file: `~/.local/state/fetchbot/fetchbot.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fetchbot")?;
    Ok(xdg_dirs.get_state_home().join("fetchbot.log"))
}

/// Per-event writer: a clone of the log file handle, or stderr if cloning failed.
enum LogSink {
    File(File),
    Stderr,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::File(f) => f.write(buf),
            LogSink::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::File(f) => f.flush(),
            LogSink::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct AppendFile(File);

impl<'a> MakeWriter<'a> for AppendFile {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(LogSink::File)
            .unwrap_or(LogSink::Stderr)
    }
}

/// Install the global subscriber writing to [`log_file_path`].
/// Returns Err when the file cannot be opened so the caller can fall back
/// to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log dir {}", dir.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(BoxMakeWriter::new(AppendFile(file)))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e))?;

    tracing::info!("fetchbot logging to {}", path.display());
    Ok(())
}

/// Install the global subscriber on stderr only.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_thread_names(true)
        .try_init();
}
