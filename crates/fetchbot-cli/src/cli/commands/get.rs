//! `fetchbot get` – download URLs and print a notification per report.
//!
//! Plays the role of the chat bot: starts jobs on a [`Supervisor`], then
//! drains the report queue once per tick until every job has finished.

use anyhow::Result;
use fetchbot_core::config::FetchbotConfig;
use fetchbot_core::naming::derive_filename;
use fetchbot_core::notice::{self, format_bytes};
use fetchbot_core::{ReportKind, Supervisor};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct GetArgs {
    pub dir: PathBuf,
    pub name: Option<String>,
    pub timeout: Option<Duration>,
}

/// Destination for `url`: `dir/name`, or `dir/<last URL segment>`.
fn destination(args: &GetArgs, url: &str) -> PathBuf {
    match &args.name {
        Some(name) => args.dir.join(name),
        None => args.dir.join(derive_filename(url)),
    }
}

/// Start one job per URL; if any start fails, cancel the ones already running.
fn start_all(supervisor: &mut Supervisor<usize>, urls: &[String], args: &GetArgs) -> Result<()> {
    for (index, url) in urls.iter().enumerate() {
        if let Err(e) = supervisor.start(url, destination(args, url), index) {
            supervisor.cancel_all();
            return Err(e.context(format!("failed to start download of {}", url)));
        }
    }
    Ok(())
}

/// Print the min-size policy outcome for a finished file; failures are
/// reported, not propagated, so the remaining jobs keep being drained.
fn apply_min_size(path: &Path, size: u64, min_size: Option<u64>) {
    match discard_if_small(path, size, min_size) {
        Ok(true) => println!(
            "[{}]:removed (smaller than {})",
            path.display(),
            format_bytes(min_size.map(|m| m as f64), 2)
        ),
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to remove undersized download: {:#}", e);
            eprintln!("[{}]:remove failed ({:#})", path.display(), e);
        }
    }
}

/// Delete a finished file below `min_size` bytes. Returns true if removed.
fn discard_if_small(path: &Path, size: u64, min_size: Option<u64>) -> Result<bool> {
    match min_size {
        Some(min) if size < min => {
            fs::remove_file(path)?;
            tracing::info!(path = %path.display(), size, min, "removed undersized download");
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Returns the number of jobs that ended in an error.
pub fn run_get(cfg: &FetchbotConfig, urls: &[String], args: &GetArgs) -> Result<usize> {
    if args.name.is_some() && urls.len() > 1 {
        anyhow::bail!("--name can only be used with a single URL");
    }

    let mut supervisor: Supervisor<usize> = Supervisor::new(cfg.download.clone());
    start_all(&mut supervisor, urls, args)?;

    let started = Instant::now();
    let mut pending = urls.len();
    let mut failures = 0;
    let mut cancelled = false;
    while pending > 0 {
        for report in supervisor.drain() {
            println!("{}", notice::render(&report));
            match &report.kind {
                ReportKind::Finish {
                    saved_path,
                    progress,
                } => {
                    pending -= 1;
                    apply_min_size(saved_path, progress.downloaded_size, cfg.min_file_size);
                }
                ReportKind::Error { .. } => {
                    pending -= 1;
                    failures += 1;
                }
                ReportKind::Start { .. } | ReportKind::Progress { .. } => {}
            }
        }
        if let Some(limit) = args.timeout {
            if !cancelled && started.elapsed() >= limit {
                tracing::info!("timeout reached after {:?}, cancelling", limit);
                supervisor.cancel_all();
                cancelled = true;
            }
        }
        if pending > 0 {
            std::thread::sleep(cfg.tick());
        }
    }
    supervisor.cleanup();
    Ok(failures)
}
