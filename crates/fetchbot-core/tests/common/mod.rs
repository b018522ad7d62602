#![allow(dead_code)]

pub mod http_server;

use fetchbot_core::{Report, Supervisor};
use std::path::Path;
use std::time::{Duration, Instant};

/// Poll `sup` until `terminals` jobs have reported FINISH or ERROR.
pub fn collect_until_terminal<I>(sup: &Supervisor<I>, terminals: usize, timeout: Duration) -> Vec<Report<I>>
where
    I: Clone + Send + 'static,
{
    let deadline = Instant::now() + timeout;
    let mut reports = Vec::new();
    while reports.iter().filter(|r: &&Report<I>| r.is_terminal()).count() < terminals {
        assert!(Instant::now() < deadline, "timed out waiting for terminal reports");
        reports.extend(sup.drain());
        std::thread::sleep(Duration::from_millis(5));
    }
    reports
}

/// Names of staged temp files left in `dir`.
pub fn temp_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(fetchbot_core::storage::TEMP_SUFFIX))
        .collect()
}
